//! DXGI Desktop Duplication screen capture.
//!
//! Uses `IDXGIOutputDuplication::AcquireNextFrame`, which itself blocks up to
//! a caller-supplied timeout and returns either a new frame or a timeout —
//! this *is* the pacing mechanism the rest of the pipeline relies on, so
//! there is deliberately no sleep/spin loop anywhere in this file.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_FLAG, D3D11_MAPPED_SUBRESOURCE, D3D11_MAP_READ,
    D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;
use windows::Win32::Graphics::Dxgi::{
    IDXGIAdapter, IDXGIDevice, IDXGIOutput, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource,
    DXGI_ERROR_ACCESS_LOST, DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
};

use super::{CaptureError, CaptureOutcome, CapturedFrame, PixelBufferPool, PooledBuffer, ScreenCapture};

/// Retries allowed for recreating the duplication object after an
/// `AccessLost` before the capture is treated as fatally broken.
const ACCESS_LOST_RETRY_LIMIT: u32 = 3;

/// Captures one monitor (identified by its output index on the adapter's
/// primary display) via Desktop Duplication.
pub struct DxgiScreenCapture {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    output: IDXGIOutput1,
    duplication: IDXGIOutputDuplication,
    staging: Option<ID3D11Texture2D>,
    pool: PixelBufferPool,
    frame_number: u32,
    output_index: u32,
}

impl DxgiScreenCapture {
    /// Creates a capture source for `output_index` on the default adapter.
    pub fn new(output_index: u32) -> Result<Self, CaptureError> {
        let (device, context) = create_device()?;
        let output = acquire_output(&device, output_index)?;
        let duplication = duplicate_output(&output, &device)?;

        Ok(Self {
            device,
            context,
            output,
            duplication,
            staging: None,
            pool: PixelBufferPool::new(2),
            frame_number: 0,
            output_index,
        })
    }

    fn recreate_duplication(&mut self) -> Result<(), CaptureError> {
        self.duplication = duplicate_output(&self.output, &self.device)?;
        Ok(())
    }

    /// Maps `texture` to CPU-readable memory and copies it into a pooled
    /// buffer, returning the buffer plus the row stride DXGI reported.
    fn copy_to_pooled_buffer(
        &mut self,
        texture: &ID3D11Texture2D,
    ) -> Result<(PooledBuffer, u32, u32, u32), CaptureError> {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging = self.ensure_staging(&desc)?;
        unsafe {
            self.context.CopyResource(
                &staging.cast::<ID3D11Resource>().map_err(dxgi_err)?,
                &texture.cast::<ID3D11Resource>().map_err(dxgi_err)?,
            );
        }

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.context
                .Map(
                    &staging.cast::<ID3D11Resource>().map_err(dxgi_err)?,
                    0,
                    D3D11_MAP_READ,
                    0,
                    Some(&mut mapped),
                )
                .map_err(dxgi_err)?;
        }

        let stride = mapped.RowPitch;
        let len = (stride as usize) * (desc.Height as usize);
        let mut buffer = self.pool.acquire(len);
        unsafe {
            std::ptr::copy_nonoverlapping(mapped.pData as *const u8, buffer.as_mut_ptr(), len);
            self.context
                .Unmap(&staging.cast::<ID3D11Resource>().map_err(dxgi_err)?, 0);
        }

        Ok((buffer, desc.Width, desc.Height, stride))
    }

    fn ensure_staging(&mut self, desc: &D3D11_TEXTURE2D_DESC) -> Result<ID3D11Texture2D, CaptureError> {
        if let Some(existing) = &self.staging {
            let mut existing_desc = D3D11_TEXTURE2D_DESC::default();
            unsafe { existing.GetDesc(&mut existing_desc) };
            if existing_desc.Width == desc.Width && existing_desc.Height == desc.Height {
                return Ok(existing.clone());
            }
        }

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };
        let mut staging = None;
        unsafe {
            self.device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))
                .map_err(dxgi_err)?;
        }
        let staging = staging.ok_or_else(|| CaptureError::Backend("staging texture creation returned null".into()))?;
        self.staging = Some(staging.clone());
        Ok(staging)
    }
}

impl ScreenCapture for DxgiScreenCapture {
    fn next_frame(&mut self, timeout: Duration) -> Result<CaptureOutcome, CaptureError> {
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;

        let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;

        let acquire_result = unsafe {
            self.duplication
                .AcquireNextFrame(timeout_ms, &mut frame_info, &mut resource)
        };

        match acquire_result {
            Ok(()) => {}
            Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => return Ok(CaptureOutcome::NoChange),
            Err(e) if e.code() == DXGI_ERROR_ACCESS_LOST => {
                warn!("desktop duplication access lost on output {}, recreating", self.output_index);
                for attempt in 1..=ACCESS_LOST_RETRY_LIMIT {
                    if self.recreate_duplication().is_ok() {
                        info!("desktop duplication recovered after {attempt} attempt(s)");
                        return Ok(CaptureOutcome::NoChange);
                    }
                }
                warn!("desktop duplication recovery exhausted after {ACCESS_LOST_RETRY_LIMIT} attempts");
                return Err(CaptureError::AccessLostUnrecoverable);
            }
            Err(e) => return Err(dxgi_err(e)),
        }

        // Always release the frame on every exit path below, even on error,
        // so the duplication object doesn't stall future AcquireNextFrame
        // calls.
        let result = (|| -> Result<CaptureOutcome, CaptureError> {
            if frame_info.LastPresentTime == 0 {
                // Cursor-only update: no new desktop image.
                return Ok(CaptureOutcome::NoChange);
            }

            let resource = resource.ok_or_else(|| {
                CaptureError::Backend("AcquireNextFrame succeeded without a resource".into())
            })?;
            let texture: ID3D11Texture2D = resource.cast().map_err(dxgi_err)?;

            let (pixels, width, height, stride) = self.copy_to_pooled_buffer(&texture)?;
            self.frame_number += 1;
            debug!(width, height, stride, frame = self.frame_number, "captured frame");

            Ok(CaptureOutcome::Frame(CapturedFrame {
                pixels,
                width,
                height,
                stride,
                timestamp: Instant::now(),
                frame_number: self.frame_number,
            }))
        })();

        unsafe {
            let _ = self.duplication.ReleaseFrame();
        }

        result
    }

    fn return_buffer(&mut self, buffer: PooledBuffer) {
        self.pool.release(buffer);
    }
}

fn create_device() -> Result<(ID3D11Device, ID3D11DeviceContext), CaptureError> {
    let mut device = None;
    let mut context = None;
    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            HMODULE::default(),
            D3D11_CREATE_DEVICE_FLAG(0),
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )
        .map_err(dxgi_err)?;
    }
    let device = device.ok_or(CaptureError::DeviceNotPresent)?;
    let context = context.ok_or(CaptureError::DeviceNotPresent)?;
    Ok((device, context))
}

fn acquire_output(device: &ID3D11Device, output_index: u32) -> Result<IDXGIOutput1, CaptureError> {
    let dxgi_device: IDXGIDevice = device.cast().map_err(dxgi_err)?;
    let adapter: IDXGIAdapter = unsafe { dxgi_device.GetAdapter() }.map_err(dxgi_err)?;
    let output: IDXGIOutput = unsafe { adapter.EnumOutputs(output_index) }.map_err(|_| CaptureError::DeviceNotPresent)?;
    output.cast().map_err(dxgi_err)
}

fn duplicate_output(
    output: &IDXGIOutput1,
    device: &ID3D11Device,
) -> Result<IDXGIOutputDuplication, CaptureError> {
    unsafe { output.DuplicateOutput(device) }.map_err(|e| {
        if e.code().0 as u32 == 0x80070005 {
            CaptureError::AccessDenied
        } else {
            dxgi_err(e)
        }
    })
}

fn dxgi_err(e: windows::core::Error) -> CaptureError {
    CaptureError::Backend(e.message())
}
