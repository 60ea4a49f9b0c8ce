use anyhow::{anyhow, bail, Result};
use log::{debug, error, info, warn};
use ndk_sys::{
    acamera_metadata_tag, camera_status_t, media_status_t, ACameraCaptureSession,
    ACameraCaptureSession_close, ACameraCaptureSession_setRepeatingRequest,
    ACameraCaptureSession_stateCallbacks, ACameraCaptureSession_stopRepeating, ACameraDevice,
    ACameraDevice_StateCallbacks, ACameraDevice_close, ACameraDevice_createCaptureRequest,
    ACameraDevice_createCaptureSession, ACameraDevice_getId, ACameraDevice_request_template,
    ACameraIdList, ACameraManager, ACameraManager_create, ACameraManager_delete,
    ACameraManager_deleteCameraIdList, ACameraManager_getCameraCharacteristics,
    ACameraManager_getCameraIdList, ACameraManager_openCamera, ACameraMetadata,
    ACameraMetadata_const_entry, ACameraMetadata_free, ACameraMetadata_getConstEntry,
    ACameraOutputTarget, ACameraOutputTarget_create, ACameraOutputTarget_free, ACaptureRequest,
    ACaptureRequest_addTarget, ACaptureRequest_free, ACaptureSessionOutput,
    ACaptureSessionOutputContainer, ACaptureSessionOutputContainer_add,
    ACaptureSessionOutputContainer_create, ACaptureSessionOutputContainer_free,
    ACaptureSessionOutput_create, ACaptureSessionOutput_free, AImage, AImageReader,
    AImageReader_ImageListener, AImageReader_acquireLatestImage, AImageReader_delete,
    AImageReader_getWindow, AImageReader_new, AImageReader_setImageListener, AImage_delete,
    AImage_getHeight, AImage_getPlaneData, AImage_getPlanePixelStride, AImage_getPlaneRowStride,
    AImage_getWidth, ANativeWindow, AIMAGE_FORMATS,
};
use std::{
    ffi::{c_int, c_void, CStr, CString},
    mem::zeroed,
    ptr::null_mut,
    slice,
};

use super::{
    choose_preview_size,
    frame::{self, YuvPlanes},
    CameraError, CameraProvider, CameraSelector, Preview, PreviewFrame, PreviewSurface,
};
use crate::config::PreviewConfig;

#[link(name = "camera2ndk")]
extern "C" {}

#[link(name = "mediandk")]
extern "C" {}

// ACAMERA_LENS_FACING values
const LENS_FACING_FRONT: u8 = 0;
const LENS_FACING_BACK: u8 = 1;

const MAX_IMAGES: i32 = 2;

fn camera_check(status: camera_status_t, what: &str) -> Result<()> {
    if status == camera_status_t::ACAMERA_OK {
        Ok(())
    } else {
        Err(anyhow!("Failed to {what} (reason: {status:?})"))
    }
}

fn media_check(status: media_status_t, what: &str) -> Result<()> {
    if status == media_status_t::AMEDIA_OK {
        Ok(())
    } else {
        Err(anyhow!("Failed to {what} (reason: {status:?})"))
    }
}

unsafe fn get_cstr<'a>(s: *const std::os::raw::c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

struct CameraInfo {
    id: CString,
    selector: Option<CameraSelector>,
    sensor_orientation: i32,
    /// YUV_420_888 output sizes
    sizes: Vec<(u32, u32)>,
}

/// camera2 NDK provider. Holds one preview session at a time.
pub struct AndroidCameraProvider {
    manager: *mut ACameraManager,
    cameras: Vec<CameraInfo>,
    requested: (u32, u32),
    session: Option<Box<PreviewSession>>,
}

impl AndroidCameraProvider {
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let manager = unsafe { ACameraManager_create() };
        if manager.is_null() {
            bail!("ACameraManager_create returned null");
        }
        let cameras = match unsafe { enumerate_cameras(manager) } {
            Ok(cameras) => cameras,
            Err(err) => {
                unsafe { ACameraManager_delete(manager) };
                return Err(err);
            }
        };
        for camera in &cameras {
            info!(
                "camera {:?}: facing={:?} orientation={} sizes={:?}",
                camera.id, camera.selector, camera.sensor_orientation, camera.sizes
            );
        }
        Ok(Self {
            manager,
            cameras,
            requested: (config.width, config.height),
            session: None,
        })
    }
}

impl CameraProvider for AndroidCameraProvider {
    fn unbind_all(&mut self) {
        if self.session.take().is_some() {
            info!("Close Camera");
        }
    }

    fn bind(&mut self, selector: CameraSelector, preview: Preview) -> Result<(), CameraError> {
        self.unbind_all();
        let camera = self
            .cameras
            .iter()
            .find(|camera| camera.selector == Some(selector))
            .ok_or(CameraError::NoDevice(selector))?;
        let size = choose_preview_size(&camera.sizes, self.requested).unwrap_or(self.requested);
        info!("opening {selector} camera {:?} at {}x{}", camera.id, size.0, size.1);
        let sink = FrameSink {
            surface: preview.surface().clone(),
            rotation: camera.sensor_orientation,
            mirror: selector == CameraSelector::Front,
            rgba: vec![],
        };
        let session = unsafe { PreviewSession::start(self.manager, &camera.id, size, sink)? };
        self.session = Some(session);
        Ok(())
    }
}

impl Drop for AndroidCameraProvider {
    fn drop(&mut self) {
        self.unbind_all();
        unsafe { ACameraManager_delete(self.manager) };
    }
}

unsafe fn enumerate_cameras(manager: *mut ACameraManager) -> Result<Vec<CameraInfo>> {
    let mut id_list: *mut ACameraIdList = null_mut();
    camera_check(
        ACameraManager_getCameraIdList(manager, &mut id_list),
        "get camera id list",
    )?;
    if id_list.is_null() {
        bail!("Failed to get camera id list (reason: camera_id_list is null)");
    }
    let list = &*id_list;
    let ids: &[*const std::os::raw::c_char] = if list.numCameras > 0 && !list.cameraIds.is_null() {
        slice::from_raw_parts(list.cameraIds, list.numCameras as usize)
    } else {
        &[]
    };
    let mut cameras = Vec::with_capacity(ids.len());
    for &id in ids {
        let id = CStr::from_ptr(id).to_owned();
        match describe_camera(manager, id) {
            Ok(camera) => cameras.push(camera),
            Err(err) => warn!("skipping camera: {err:#}"),
        }
    }
    ACameraManager_deleteCameraIdList(id_list);
    if cameras.is_empty() {
        bail!("No camera device detected.");
    }
    Ok(cameras)
}

unsafe fn describe_camera(manager: *mut ACameraManager, id: CString) -> Result<CameraInfo> {
    let mut metadata: *mut ACameraMetadata = null_mut();
    camera_check(
        ACameraManager_getCameraCharacteristics(manager, id.as_ptr(), &mut metadata),
        "get camera characteristics",
    )?;

    let selector = const_entry(metadata, acamera_metadata_tag::ACAMERA_LENS_FACING.0)
        .filter(|entry| entry.count > 0)
        .and_then(|entry| match *entry.data.u8_ {
            LENS_FACING_FRONT => Some(CameraSelector::Front),
            LENS_FACING_BACK => Some(CameraSelector::Back),
            _ => None,
        });
    let orientation_tag = acamera_metadata_tag::ACAMERA_SENSOR_ORIENTATION.0;
    let sensor_orientation = const_entry(metadata, orientation_tag)
        .filter(|entry| entry.count > 0)
        .map(|entry| *entry.data.i32_)
        .unwrap_or(0);
    let sizes = yuv_output_sizes(metadata);

    ACameraMetadata_free(metadata);
    Ok(CameraInfo {
        id,
        selector,
        sensor_orientation,
        sizes,
    })
}

unsafe fn const_entry(
    metadata: *const ACameraMetadata,
    tag: u32,
) -> Option<ACameraMetadata_const_entry> {
    let mut entry: ACameraMetadata_const_entry = zeroed();
    let status = ACameraMetadata_getConstEntry(metadata, tag, &mut entry);
    (status == camera_status_t::ACAMERA_OK).then_some(entry)
}

// Stream configurations are (format, width, height, is_input) quadruples.
unsafe fn yuv_output_sizes(metadata: *const ACameraMetadata) -> Vec<(u32, u32)> {
    let Some(entry) = const_entry(
        metadata,
        acamera_metadata_tag::ACAMERA_SCALER_AVAILABLE_STREAM_CONFIGURATIONS.0,
    ) else {
        return vec![];
    };
    let data = slice::from_raw_parts(entry.data.i32_, entry.count as usize);
    data.chunks_exact(4)
        .filter(|config| {
            config[0] == AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32 && config[3] == 0
        })
        .map(|config| (config[1] as u32, config[2] as u32))
        .collect()
}

/// Converts frames on the image reader thread and hands them to the surface.
struct FrameSink {
    surface: PreviewSurface,
    rotation: i32,
    mirror: bool,
    rgba: Vec<u8>,
}

impl FrameSink {
    unsafe fn deliver(&mut self, reader: *mut AImageReader) -> Result<()> {
        let mut image: *mut AImage = null_mut();
        media_check(
            AImageReader_acquireLatestImage(reader, &mut image),
            "acquire latest image from image reader",
        )?;
        let frame = self.convert(image);
        AImage_delete(image);
        if !self.surface.present(frame?) {
            debug!("preview surface is gone, frame dropped");
        }
        Ok(())
    }

    unsafe fn convert(&mut self, image: *mut AImage) -> Result<PreviewFrame> {
        let (mut width, mut height) = (0, 0);
        media_check(AImage_getWidth(image, &mut width), "get image width")?;
        media_check(AImage_getHeight(image, &mut height), "get image height")?;
        let (y, y_row_stride, _) = plane(image, 0)?;
        let (u, uv_row_stride, uv_pixel_stride) = plane(image, 1)?;
        let (v, _, _) = plane(image, 2)?;
        let planes = YuvPlanes {
            y,
            u,
            v,
            y_row_stride,
            uv_row_stride,
            uv_pixel_stride,
        };
        frame::yuv420_to_rgba(&planes, width as u32, height as u32, &mut self.rgba)?;
        let oriented = frame::orient(
            std::mem::take(&mut self.rgba),
            width as u32,
            height as u32,
            self.rotation,
            self.mirror,
        )?;
        let preview = frame::to_preview_frame(&oriented);
        self.rgba = oriented.into_raw();
        Ok(preview)
    }
}

unsafe fn plane<'a>(image: *mut AImage, index: c_int) -> Result<(&'a [u8], usize, usize)> {
    let mut data: *mut u8 = null_mut();
    let mut len = 0;
    let mut row_stride = 0;
    let mut pixel_stride = 0;
    media_check(
        AImage_getPlaneData(image, index, &mut data, &mut len),
        "get plane data",
    )?;
    media_check(
        AImage_getPlaneRowStride(image, index, &mut row_stride),
        "get plane row stride",
    )?;
    media_check(
        AImage_getPlanePixelStride(image, index, &mut pixel_stride),
        "get plane pixel stride",
    )?;
    if data.is_null() || len <= 0 {
        bail!("plane {index} is empty");
    }
    Ok((
        slice::from_raw_parts(data, len as usize),
        row_stride as usize,
        pixel_stride as usize,
    ))
}

/// Every NDK object of one running preview. Boxed so the callback contexts
/// stay at a fixed address.
struct PreviewSession {
    device: *mut ACameraDevice,
    reader: *mut AImageReader,
    request: *mut ACaptureRequest,
    target: *mut ACameraOutputTarget,
    session_output: *mut ACaptureSessionOutput,
    outputs: *mut ACaptureSessionOutputContainer,
    capture_session: *mut ACameraCaptureSession,
    device_callbacks: ACameraDevice_StateCallbacks,
    session_callbacks: ACameraCaptureSession_stateCallbacks,
    image_listener: AImageReader_ImageListener,
    sink: FrameSink,
}

unsafe extern "C" fn on_image_available(context: *mut c_void, reader: *mut AImageReader) {
    let sink = &mut *(context as *mut FrameSink);
    if let Err(err) = sink.deliver(reader) {
        debug!("preview frame skipped: {err:#}");
    }
}

unsafe extern "C" fn on_disconnected(_context: *mut c_void, device: *mut ACameraDevice) {
    info!(
        "Camera(id: {:?}) is disconnected.",
        get_cstr(ACameraDevice_getId(device))
    );
}

unsafe extern "C" fn on_error(_context: *mut c_void, device: *mut ACameraDevice, error: c_int) {
    error!(
        "Error(code: {}) on Camera(id: {:?}).",
        error,
        get_cstr(ACameraDevice_getId(device))
    );
}

unsafe extern "C" fn on_session_ready(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    debug!("Session is ready. {:?}", session);
}

unsafe extern "C" fn on_session_active(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    info!("Session is activated. {:?}", session);
}

unsafe extern "C" fn on_session_closed(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    info!("Session is closed. {:?}", session);
}

impl PreviewSession {
    /// Opens `camera_id` and starts a repeating preview request into an image reader.
    /// On failure everything created so far is released by `Drop`.
    unsafe fn start(
        manager: *mut ACameraManager,
        camera_id: &CStr,
        (width, height): (u32, u32),
        sink: FrameSink,
    ) -> Result<Box<Self>> {
        let mut session = Box::new(PreviewSession {
            device: null_mut(),
            reader: null_mut(),
            request: null_mut(),
            target: null_mut(),
            session_output: null_mut(),
            outputs: null_mut(),
            capture_session: null_mut(),
            device_callbacks: zeroed(),
            session_callbacks: zeroed(),
            image_listener: AImageReader_ImageListener {
                context: null_mut(),
                onImageAvailable: None,
            },
            sink,
        });
        let s = &mut *session;

        media_check(
            AImageReader_new(
                width as i32,
                height as i32,
                AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32,
                MAX_IMAGES,
                &mut s.reader,
            ),
            "create image reader",
        )?;
        s.image_listener.context = &mut s.sink as *mut FrameSink as *mut c_void;
        s.image_listener.onImageAvailable = Some(on_image_available);
        media_check(
            AImageReader_setImageListener(s.reader, &mut s.image_listener),
            "set image listener",
        )?;

        let mut window: *mut ANativeWindow = null_mut();
        media_check(
            AImageReader_getWindow(s.reader, &mut window),
            "get image reader window",
        )?;

        s.device_callbacks.onDisconnected = Some(on_disconnected);
        s.device_callbacks.onError = Some(on_error);
        camera_check(
            ACameraManager_openCamera(
                manager,
                camera_id.as_ptr(),
                &mut s.device_callbacks,
                &mut s.device,
            ),
            "open camera device",
        )?;

        camera_check(
            ACameraDevice_createCaptureRequest(
                s.device,
                ACameraDevice_request_template::TEMPLATE_PREVIEW,
                &mut s.request,
            ),
            "create preview capture request",
        )?;
        camera_check(
            ACameraOutputTarget_create(window, &mut s.target),
            "create output target",
        )?;
        camera_check(
            ACaptureRequest_addTarget(s.request, s.target),
            "add output target",
        )?;

        camera_check(
            ACaptureSessionOutput_create(window, &mut s.session_output),
            "create capture session output",
        )?;
        camera_check(
            ACaptureSessionOutputContainer_create(&mut s.outputs),
            "create capture session output container",
        )?;
        camera_check(
            ACaptureSessionOutputContainer_add(s.outputs, s.session_output),
            "add capture session output",
        )?;

        s.session_callbacks.onReady = Some(on_session_ready);
        s.session_callbacks.onActive = Some(on_session_active);
        s.session_callbacks.onClosed = Some(on_session_closed);
        camera_check(
            ACameraDevice_createCaptureSession(
                s.device,
                s.outputs,
                &s.session_callbacks,
                &mut s.capture_session,
            ),
            "create capture session",
        )?;
        camera_check(
            ACameraCaptureSession_setRepeatingRequest(
                s.capture_session,
                null_mut(),
                1,
                &mut s.request,
                null_mut(),
            ),
            "start repeating preview request",
        )?;

        Ok(session)
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        unsafe {
            if !self.capture_session.is_null() {
                let status = ACameraCaptureSession_stopRepeating(self.capture_session);
                if status != camera_status_t::ACAMERA_OK {
                    warn!("stopRepeating failed: {status:?}");
                }
                ACameraCaptureSession_close(self.capture_session);
                self.capture_session = null_mut();
            }
            if !self.device.is_null() {
                if ACameraDevice_close(self.device) != camera_status_t::ACAMERA_OK {
                    error!("Failed to close CameraDevice.");
                }
                self.device = null_mut();
            }
            if !self.request.is_null() {
                ACaptureRequest_free(self.request);
                self.request = null_mut();
            }
            if !self.target.is_null() {
                ACameraOutputTarget_free(self.target);
                self.target = null_mut();
            }
            if !self.outputs.is_null() {
                ACaptureSessionOutputContainer_free(self.outputs);
                self.outputs = null_mut();
            }
            if !self.session_output.is_null() {
                ACaptureSessionOutput_free(self.session_output);
                self.session_output = null_mut();
            }
            // last, so no listener callback can outlive the sink
            if !self.reader.is_null() {
                AImageReader_delete(self.reader);
                self.reader = null_mut();
            }
        }
    }
}
