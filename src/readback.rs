//! Copying buffer contents back to the CPU.
//!
//! A [`Readback`] moves through `Idle -> InFlight -> Ready -> Idle`. The copy
//! and map request are issued by [`Readback::copy_to_cpu`]; [`Readback::poll`]
//! must then be called (once per frame is enough) until the data arrives and
//! the record is locked. [`Readback::release`] unlocks it for the next copy.

use std::sync::mpsc::TryRecvError;

use bytemuck::Pod;

use crate::error::NanoError;
use crate::error::NanoResult;
use crate::gpu::BufferHandle;
use crate::gpu::GpuDevice;
use crate::gpu::GpuObject;
use crate::gpu::PendingMap;
use crate::pool::BufferId;
use crate::resources::ResourceManager;

#[derive(Debug)]
enum ReadbackState
{
        Idle,
        InFlight
        {
                pending: PendingMap,
                owns_staging: bool,
        },
        Ready
        {
                data: Vec<u8>,
        },
}

#[derive(Debug)]
pub struct Readback
{
        pub src: BufferId,
        pub src_offset: u64,
        /// Where the copy lands inside the staging buffer.
        pub dst_offset: u64,
        pub size: u64,
        state: ReadbackState,
}

impl Readback
{
        pub fn new(
                src: BufferId,
                size: u64,
        ) -> Self
        {
                Self {
                        src,
                        src_offset: 0,
                        dst_offset: 0,
                        size,
                        state: ReadbackState::Idle,
                }
        }

        pub fn with_offsets(
                mut self,
                src_offset: u64,
                dst_offset: u64,
        ) -> Self
        {
                self.src_offset = src_offset;
                self.dst_offset = dst_offset;
                self
        }

        /// Issues the GPU copy into `staging`, or into a staging buffer owned
        /// by this readback when none is given.
        pub fn copy_to_cpu<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                resources: &ResourceManager,
                staging: Option<BufferHandle>,
        ) -> NanoResult<()>
        {
                if !matches!(self.state, ReadbackState::Idle)
                {
                        return Err(NanoError::ReadbackBusy);
                }

                let source = resources.buffer(self.src)?;

                if self.src_offset + self.size > source.size
                {
                        return Err(NanoError::ReadbackFailed(format!(
                                "{} bytes at offset {} exceed buffer '{}' ({} bytes)",
                                self.size, self.src_offset, source.label, source.size
                        )));
                }

                let pending = device.copy_to_staging(
                        source.handle,
                        self.src_offset,
                        self.dst_offset,
                        self.size,
                        staging,
                )?;

                log::debug!("Readback of '{}' issued, {} bytes", source.label, self.size);

                self.state = ReadbackState::InFlight {
                        pending,
                        owns_staging: staging.is_none(),
                };

                Ok(())
        }

        /// Checks for map completion without blocking. Returns whether data
        /// is available.
        pub fn poll<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        ) -> NanoResult<bool>
        {
                let result = match &self.state
                {
                        ReadbackState::Idle => return Ok(false),
                        ReadbackState::Ready { .. } => return Ok(true),
                        ReadbackState::InFlight { pending, .. } =>
                        {
                                device.poll();

                                match pending.receiver.try_recv()
                                {
                                        Ok(result) => result,
                                        Err(TryRecvError::Empty) => return Ok(false),
                                        Err(TryRecvError::Disconnected) => Err("map callback dropped".to_owned()),
                                }
                        }
                };

                let ReadbackState::InFlight { pending, owns_staging } =
                        std::mem::replace(&mut self.state, ReadbackState::Idle)
                else
                {
                        return Ok(false);
                };

                let read = match result
                {
                        Ok(()) => device.read_mapped(pending.staging, self.dst_offset, self.size),
                        Err(e) => Err(NanoError::ReadbackFailed(e)),
                };

                if owns_staging
                {
                        device.release(GpuObject::Buffer(pending.staging));
                }

                let data = read.inspect_err(|e| log::error!("Readback of {} failed: {e}", self.src))?;

                self.state = ReadbackState::Ready { data };

                Ok(true)
        }

        /// True once the mapped data has arrived, until it is released.
        pub fn is_locked(&self) -> bool
        {
                self.is_ready()
        }

        pub fn is_in_flight(&self) -> bool
        {
                matches!(self.state, ReadbackState::InFlight { .. })
        }

        pub fn is_ready(&self) -> bool
        {
                matches!(self.state, ReadbackState::Ready { .. })
        }

        pub fn data(&self) -> Option<&[u8]>
        {
                match &self.state
                {
                        ReadbackState::Ready { data } => Some(data),
                        _ => None,
                }
        }

        /// The ready bytes reinterpreted as `T`. Trailing bytes that do not
        /// fill a whole `T` are dropped.
        pub fn data_as<T: Pod>(&self) -> Option<Vec<T>>
        {
                let data = self.data()?;

                let whole = data.len() - data.len() % std::mem::size_of::<T>().max(1);

                Some(bytemuck::pod_collect_to_vec(&data[..whole]))
        }

        /// Drops the data and unlocks for the next copy. A copy still in
        /// flight is abandoned and its owned staging buffer freed.
        pub fn release<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        )
        {
                let previous = std::mem::replace(&mut self.state, ReadbackState::Idle);

                if let ReadbackState::InFlight { pending, owns_staging } = previous
                {
                        log::warn!("Readback of {} released while in flight", self.src);

                        if owns_staging
                        {
                                device.release(GpuObject::Buffer(pending.staging));
                        }
                }
        }
}
