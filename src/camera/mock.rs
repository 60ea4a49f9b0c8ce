//! Recording provider for tests.

use std::{cell::RefCell, rc::Rc};

use anyhow::anyhow;

use super::{CameraError, CameraProvider, CameraSelector, Preview, SharedProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    UnbindAll,
    Bind(CameraSelector),
}

#[derive(Default)]
pub struct MockProvider {
    pub calls: Vec<Call>,
    pub fail_bind: bool,
    bound: Option<CameraSelector>,
}

impl MockProvider {
    /// Returns the concrete handle for assertions plus the shared handle for the code under test.
    pub fn shared(fail_bind: bool) -> (Rc<RefCell<MockProvider>>, SharedProvider) {
        let mock = Rc::new(RefCell::new(MockProvider {
            fail_bind,
            ..Default::default()
        }));
        let shared: SharedProvider = mock.clone();
        (mock, shared)
    }

    pub fn bound(&self) -> Option<CameraSelector> {
        self.bound
    }

    pub fn binds(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Bind(_)))
            .count()
    }
}

impl CameraProvider for MockProvider {
    fn unbind_all(&mut self) {
        self.calls.push(Call::UnbindAll);
        self.bound = None;
    }

    fn bind(&mut self, selector: CameraSelector, _preview: Preview) -> Result<(), CameraError> {
        self.calls.push(Call::Bind(selector));
        if self.fail_bind {
            return Err(anyhow!("mock bind failure").into());
        }
        self.bound = Some(selector);
        Ok(())
    }
}
