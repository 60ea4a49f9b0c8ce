use anyhow::Result;
use jni::{
    objects::{JObject, JValueGen},
    sys::{jint, JNIInvokeInterface_, _jobject},
    JNIEnv, JavaVM,
};
use log::info;

use super::{Platform, CAMERA_PERMISSION};

/// Runtime permissions only exist from Marshmallow on.
const RUNTIME_PERMISSION_SDK: i32 = 23;

pub struct AndroidPlatform {
    app: slint::android::AndroidApp,
}

impl AndroidPlatform {
    pub fn new(app: slint::android::AndroidApp) -> Self {
        Self { app }
    }

    fn with_activity<T>(&self, f: impl FnOnce(&mut JNIEnv, &JObject) -> Result<T>) -> Result<T> {
        let vm = self.app.vm_as_ptr() as *mut *const JNIInvokeInterface_;
        let vm = unsafe { JavaVM::from_raw(vm)? };
        let mut env = vm.attach_current_thread()?;
        let activity = unsafe { JObject::from_raw(self.app.activity_as_ptr() as *mut _jobject) };
        f(&mut env, &activity)
    }

    pub fn sdk_version(&self) -> Result<i32> {
        self.with_activity(|env, _| {
            Ok(env
                .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")?
                .i()?)
        })
    }

    fn check_self_permission(&self, permission: &str) -> Result<bool> {
        self.with_activity(|env, activity| {
            let granted = env
                .get_static_field(
                    "android/content/pm/PackageManager",
                    "PERMISSION_GRANTED",
                    "I",
                )?
                .i()?;
            let permission = env.new_string(permission)?;
            let result = env
                .call_method(
                    activity,
                    "checkSelfPermission",
                    "(Ljava/lang/String;)I",
                    &[JValueGen::Object(&JObject::from(permission))],
                )?
                .i()?;
            Ok(result == granted)
        })
    }

    fn request_permissions(&self, permissions: &[&str], request_code: i32) -> Result<()> {
        self.with_activity(|env, activity| {
            let length = permissions.len() as jint;
            let array = env.new_object_array(length, "java/lang/String", JObject::null())?;
            for (index, permission) in permissions.iter().enumerate() {
                let permission = env.new_string(*permission)?;
                env.set_object_array_element(&array, index as jint, permission)?;
            }
            env.call_method(
                activity,
                "requestPermissions",
                "([Ljava/lang/String;I)V",
                &[
                    JValueGen::Object(&JObject::from(array)),
                    request_code.into(),
                ],
            )?;
            Ok(())
        })
    }
}

impl Platform for AndroidPlatform {
    fn camera_permission_granted(&self) -> Result<bool> {
        if self.sdk_version()? < RUNTIME_PERMISSION_SDK {
            return Ok(true);
        }
        self.check_self_permission(CAMERA_PERMISSION)
    }

    fn request_camera_permission(&self, request_code: i32) -> Result<()> {
        info!("requesting {CAMERA_PERMISSION} (request code {request_code})");
        self.request_permissions(&[CAMERA_PERMISSION], request_code)
    }

    fn window_focused(&self) -> Result<bool> {
        self.with_activity(|env, activity| {
            Ok(env.call_method(activity, "hasWindowFocus", "()Z", &[])?.z()?)
        })
    }
}
