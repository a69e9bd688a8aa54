use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use wgpu::{Device, ErrorFilter};

fn poll_scope(device: &Device) -> Result<(), wgpu::Error> {
    let mut future = device.pop_error_scope();
    let pin = Pin::new(&mut future);
    match pin.poll(&mut Context::from_waker(&noop_waker::noop_waker())) {
        // We got an error, so return an error.
        Poll::Ready(Some(error)) => Err(error),
        // We got no error, so return nothing.
        Poll::Ready(None) => Ok(()),
        // We're on webgpu, pretend everything always works.
        Poll::Pending => Ok(()),
    }
}

/// Catches out of memory errors from buffer and texture creation.
#[must_use = "All error scopes must end in a call to `end`"]
pub struct AllocationErrorScope<'a> {
    device: &'a Device,
    ended: bool,
}

impl<'a> AllocationErrorScope<'a> {
    pub fn new(device: &'a Device) -> Self {
        device.push_error_scope(ErrorFilter::OutOfMemory);
        Self { device, ended: false }
    }

    pub fn end(mut self) -> Result<(), wgpu::Error> {
        self.ended = true;
        poll_scope(self.device)
    }
}

impl<'a> Drop for AllocationErrorScope<'a> {
    fn drop(&mut self) {
        if !self.ended {
            log::error!("AllocationErrorScope dropped without calling `end`");
        }
    }
}

/// Catches validation errors, used around shader and pipeline creation.
#[must_use = "All error scopes must end in a call to `end`"]
pub struct ValidationErrorScope<'a> {
    device: &'a Device,
    ended: bool,
}

impl<'a> ValidationErrorScope<'a> {
    pub fn new(device: &'a Device) -> Self {
        device.push_error_scope(ErrorFilter::Validation);
        Self { device, ended: false }
    }

    pub fn end(mut self) -> Result<(), wgpu::Error> {
        self.ended = true;
        poll_scope(self.device)
    }
}

impl<'a> Drop for ValidationErrorScope<'a> {
    fn drop(&mut self) {
        if !self.ended {
            log::error!("ValidationErrorScope dropped without calling `end`");
        }
    }
}
