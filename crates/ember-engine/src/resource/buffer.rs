use crate::device::{BufferDescriptor, Device};
use crate::error::{RenderError, Result};

use super::{UniformData, VertexData};

/// Alignment of queue writes and uniform buffer sizes, in bytes.
pub const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

/// A device buffer plus the metadata the core validates against.
///
/// Size and usage are fixed at creation.
#[derive(Debug)]
pub struct GpuBuffer<D: Device> {
    raw: D::Buffer,
    label: String,
    size: u64,
    usage: wgpu::BufferUsages,
}

impl<D: Device> GpuBuffer<D> {
    #[inline]
    pub fn raw(&self) -> &D::Buffer {
        &self.raw
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    /// Fails with `Usage` unless every flag in `required` was requested at creation.
    pub fn require(&self, required: wgpu::BufferUsages) -> Result<()> {
        if self.usage.contains(required) {
            Ok(())
        } else {
            Err(RenderError::Usage {
                required,
                actual: self.usage,
            })
        }
    }
}

/// Checks a buffer request before it reaches the device.
pub fn validate_allocation(size: u64, usage: wgpu::BufferUsages, max_size: u64) -> Result<()> {
    use wgpu::BufferUsages as U;

    if size == 0 {
        return Err(RenderError::Allocation("buffer size must be non-zero".into()));
    }
    if size > max_size {
        return Err(RenderError::Allocation(format!(
            "buffer size {size} exceeds device maximum {max_size}"
        )));
    }
    if usage.is_empty() {
        return Err(RenderError::Allocation("buffer usage must not be empty".into()));
    }
    if usage.contains(U::UNIFORM) && size % COPY_ALIGNMENT != 0 {
        return Err(RenderError::Allocation(format!(
            "uniform buffer size {size} is not {COPY_ALIGNMENT}-byte aligned"
        )));
    }
    if usage.contains(U::MAP_READ) && !(U::MAP_READ | U::COPY_DST).contains(usage) {
        return Err(RenderError::Allocation(format!(
            "MAP_READ may only be combined with COPY_DST, got {usage:?}"
        )));
    }
    if usage.contains(U::MAP_WRITE) && !(U::MAP_WRITE | U::COPY_SRC).contains(usage) {
        return Err(RenderError::Allocation(format!(
            "MAP_WRITE may only be combined with COPY_SRC, got {usage:?}"
        )));
    }
    Ok(())
}

/// Allocates buffers and uploads host data into them.
///
/// Uploads go through the device queue and are ordered before any later
/// submission, so a frame that uploads first and submits last always reads
/// the uploaded bytes.
#[derive(Debug)]
pub struct ResourceBuilder<'d, D: Device> {
    device: &'d D,
    extra_usage: wgpu::BufferUsages,
    uploaded_bytes: u64,
}

impl<'d, D: Device> ResourceBuilder<'d, D> {
    pub fn new(device: &'d D) -> Self {
        Self {
            device,
            extra_usage: wgpu::BufferUsages::empty(),
            uploaded_bytes: 0,
        }
    }

    /// Adds `COPY_SRC` to every convenience-created buffer so it can be read back.
    pub fn with_readback(mut self) -> Self {
        self.extra_usage |= wgpu::BufferUsages::COPY_SRC;
        self
    }

    /// Total bytes enqueued through [`upload`](Self::upload).
    #[inline]
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<GpuBuffer<D>> {
        validate_allocation(size, usage, self.device.limits().max_buffer_size)?;

        let raw = self.device.create_buffer(&BufferDescriptor { label, size, usage })?;
        log::debug!("buffer '{label}' created: {size} bytes, {usage:?}");

        Ok(GpuBuffer {
            raw,
            label: label.to_string(),
            size,
            usage,
        })
    }

    /// Enqueues a write of `data` at `offset`.
    pub fn upload(&mut self, buffer: &GpuBuffer<D>, offset: u64, data: &[u8]) -> Result<()> {
        let len = data.len() as u64;
        let end = offset.checked_add(len).ok_or(RenderError::Range {
            offset,
            len,
            size: buffer.size,
        })?;
        if end > buffer.size {
            return Err(RenderError::Range {
                offset,
                len,
                size: buffer.size,
            });
        }
        buffer.require(wgpu::BufferUsages::COPY_DST)?;
        if offset % COPY_ALIGNMENT != 0 || len % COPY_ALIGNMENT != 0 {
            return Err(RenderError::UnalignedWrite { offset, len });
        }

        self.device.write_buffer(&buffer.raw, offset, data)?;
        self.uploaded_bytes += len;
        log::debug!("upload to '{}': {len} bytes at {offset}", buffer.label);
        Ok(())
    }

    /// Creates a `VERTEX | COPY_DST` buffer sized exactly for `data` and uploads it.
    pub fn create_vertex_buffer(&mut self, label: &str, data: &VertexData) -> Result<GpuBuffer<D>> {
        let bytes = data.as_bytes();
        let usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST | self.extra_usage;
        let buffer = self.create_buffer(label, bytes.len() as u64, usage)?;
        self.upload(&buffer, 0, bytes)?;
        Ok(buffer)
    }

    /// Creates a `UNIFORM | COPY_DST` buffer sized exactly for `data` and uploads it.
    pub fn create_uniform_buffer(&mut self, label: &str, data: &UniformData) -> Result<GpuBuffer<D>> {
        let usage = wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST | self.extra_usage;
        let buffer = self.create_buffer(label, data.size(), usage)?;
        self.upload(&buffer, 0, data.as_bytes())?;
        Ok(buffer)
    }

    /// Reads the whole buffer back to the host. Requires `COPY_SRC`.
    pub fn read_back(&self, buffer: &GpuBuffer<D>) -> Result<Vec<u8>> {
        buffer.require(wgpu::BufferUsages::COPY_SRC)?;
        self.device.read_buffer(&buffer.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{TraceDevice, TraceEvent};
    use crate::math::rotate_z;
    use crate::resource::VertexLayout;

    use wgpu::BufferUsages as U;

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn zero_size_fails() {
        let dev = TraceDevice::new();
        let rb = ResourceBuilder::new(&dev);
        assert!(matches!(
            rb.create_buffer("z", 0, U::VERTEX),
            Err(RenderError::Allocation(_))
        ));
        assert!(dev.events().is_empty());
    }

    #[test]
    fn empty_usage_fails() {
        assert!(validate_allocation(16, U::empty(), u64::MAX).is_err());
    }

    #[test]
    fn unaligned_uniform_fails() {
        assert!(matches!(
            validate_allocation(62, U::UNIFORM | U::COPY_DST, u64::MAX),
            Err(RenderError::Allocation(_))
        ));
        assert!(validate_allocation(64, U::UNIFORM | U::COPY_DST, u64::MAX).is_ok());
    }

    #[test]
    fn unaligned_vertex_buffer_is_allowed() {
        assert!(validate_allocation(6, U::VERTEX, u64::MAX).is_ok());
    }

    #[test]
    fn map_read_with_vertex_fails() {
        assert!(validate_allocation(16, U::MAP_READ | U::VERTEX, u64::MAX).is_err());
        assert!(validate_allocation(16, U::MAP_READ | U::COPY_DST, u64::MAX).is_ok());
    }

    #[test]
    fn oversized_buffer_fails() {
        let dev = TraceDevice::with_max_buffer_size(32);
        let rb = ResourceBuilder::new(&dev);
        assert!(rb.create_buffer("big", 64, U::VERTEX).is_err());
        assert!(rb.create_buffer("ok", 32, U::VERTEX).is_ok());
    }

    // ── upload ────────────────────────────────────────────────────────────

    #[test]
    fn upload_past_end_is_range_error() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev);
        let buf = rb.create_buffer("v", 16, U::VERTEX | U::COPY_DST).unwrap();
        let err = rb.upload(&buf, 8, &[0; 12]).unwrap_err();
        assert!(matches!(err, RenderError::Range { offset: 8, len: 12, size: 16 }));
    }

    #[test]
    fn upload_exactly_to_end_succeeds() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev);
        let buf = rb.create_buffer("v", 16, U::VERTEX | U::COPY_DST).unwrap();
        rb.upload(&buf, 8, &[7; 8]).unwrap();
        assert_eq!(rb.uploaded_bytes(), 8);
        assert_eq!(dev.contents(buf.raw()).unwrap()[8..], [7; 8]);
    }

    #[test]
    fn upload_without_copy_dst_is_usage_error() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev);
        let buf = rb.create_buffer("v", 16, U::VERTEX).unwrap();
        assert!(matches!(
            rb.upload(&buf, 0, &[0; 16]),
            Err(RenderError::Usage { .. })
        ));
    }

    #[test]
    fn unaligned_upload_fails() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev);
        let buf = rb.create_buffer("v", 16, U::VERTEX | U::COPY_DST).unwrap();
        assert!(matches!(
            rb.upload(&buf, 2, &[0; 4]),
            Err(RenderError::UnalignedWrite { offset: 2, len: 4 })
        ));
    }

    // ── convenience + read-back ───────────────────────────────────────────

    #[test]
    fn vertex_upload_round_trips_through_read_back() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev).with_readback();
        let data = VertexData::new(
            vec![0.0, 0.5, -0.5, -0.5, 0.5, -0.5],
            VertexLayout::position2d(),
        )
        .unwrap();

        let buf = rb.create_vertex_buffer("tri", &data).unwrap();

        assert_eq!(buf.size(), 24);
        assert!(buf.usage().contains(U::VERTEX | U::COPY_DST | U::COPY_SRC));
        assert_eq!(rb.read_back(&buf).unwrap(), data.as_bytes());
    }

    #[test]
    fn uniform_upload_round_trips_through_read_back() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev).with_readback();
        let data = UniformData::from_mat4(&rotate_z(0.5));

        let buf = rb.create_uniform_buffer("rot", &data).unwrap();

        assert_eq!(buf.size(), 64);
        assert_eq!(rb.read_back(&buf).unwrap(), data.as_bytes());
    }

    #[test]
    fn read_back_requires_copy_src() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev);
        let buf = rb
            .create_vertex_buffer("tri", &VertexData::positions2d(&[[0.0, 0.0]]))
            .unwrap();
        assert!(matches!(rb.read_back(&buf), Err(RenderError::Usage { .. })));
    }

    #[test]
    fn create_then_write_are_enqueued_in_order() {
        let dev = TraceDevice::new();
        let mut rb = ResourceBuilder::new(&dev);
        rb.create_vertex_buffer("tri", &VertexData::positions2d(&[[0.0, 0.0]]))
            .unwrap();
        let events = dev.events();
        assert!(matches!(events[0], TraceEvent::CreateBuffer { size: 8, .. }));
        assert!(matches!(events[1], TraceEvent::WriteBuffer { offset: 0, len: 8, .. }));
    }
}
