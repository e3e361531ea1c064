// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Batching of several RGA operations into one submission.
//!
//! A [`Job`] collects tasks inside librga and hands them to the driver in
//! one go when submitted.  Queuing and execution order are decided by the
//! library; this module only validates parameters and tracks the handle.
//!
//! Every task is queued through `improcessTask` with the same rects, usage
//! bits and options the matching single operation passes to `improcess`.
//!
//! The buffers a job refers to stay borrowed until the hardware is done
//! with them: until [`Job::submit`] returns, the job is cancelled, or the
//! [`Fence`] of an asynchronous submission is waited on or dropped.

use crate::{
    buffer::Buffer,
    error::{Error, Result},
    image::{Format, Rect},
    rga::{BlendMode, Config, Flip, ImageManager, Process, Rotation, JOB_API_VERSION},
};
use rga_sys::{im_job_handle_t, im_rect, IM_ASYNC, IM_STATUS, IM_SYNC};
use std::{
    ffi::c_int,
    io,
    marker::PhantomData,
    os::fd::{AsRawFd, FromRawFd, OwnedFd},
    time::Duration,
};
use tracing::{debug, trace, warn};

impl ImageManager {
    /// Creates a job on the calling thread.
    ///
    /// The manager's scheduler core is applied to the thread with
    /// `imconfig` first, as the library assigns cores to tasks per thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] for librga releases without the job
    /// API, or a status error if the library cannot create the job.
    pub fn begin_job<'b>(&self) -> Result<Job<'_, 'b>> {
        if self.version() < JOB_API_VERSION || !self.lib().has_jobs() {
            return Err(Error::Unsupported {
                feature: "job API",
                required: JOB_API_VERSION,
            });
        }
        if !self.core().is_default() {
            self.configure(Config::SchedulerCore(self.core()))?;
        }
        let handle = unsafe { self.lib().imbeginJob(0) }.unwrap_or(0);
        if handle == 0 {
            return Err(self.status_error("imbeginJob", rga_sys::IM_STATUS_FAILED));
        }
        debug!("RGA job {} created", handle);
        Ok(Job {
            imgmgr: self,
            handle,
            tasks: 0,
            finished: false,
            _buffers: PhantomData,
        })
    }
}

/// A batch of RGA tasks.
///
/// `'b` is the borrow of every buffer added to the job, so the pixels
/// cannot be freed or touched while the hardware may still use them.
/// Dropping a job that was neither submitted nor cancelled cancels it.
///
/// # Example
///
/// ```no_run
/// use edgefirst_rga::{buffer::Buffer, image::Format, rga::{Flip, ImageManager}};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let imgmgr = ImageManager::new()?;
/// let src = vec![0u8; 64 * 64 * 4];
/// let mut copied = vec![0u8; 64 * 64 * 4];
/// let mut flipped = vec![0u8; 64 * 64 * 4];
///
/// let src_buf = Buffer::from_slice(&src, 64, 64, Format::Rgba8888)?;
/// let mut job = imgmgr.begin_job()?;
/// job.copy(
///     &src_buf,
///     &mut Buffer::from_slice_mut(&mut copied, 64, 64, Format::Rgba8888)?,
/// )?
/// .flip(
///     &src_buf,
///     &mut Buffer::from_slice_mut(&mut flipped, 64, 64, Format::Rgba8888)?,
///     Flip::Horizontal,
/// )?;
/// job.submit_async()?.wait(None)?;
///
/// assert_eq!(copied, src);
/// # Ok(())
/// # }
/// ```
///
/// Memory handed to a job cannot be released before the job completes:
///
/// ```compile_fail
/// use edgefirst_rga::{buffer::Buffer, image::Format, rga::ImageManager};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let imgmgr = ImageManager::new()?;
/// let src = vec![0u8; 64 * 64 * 4];
/// let mut out = vec![0u8; 64 * 64 * 4];
///
/// let mut job = imgmgr.begin_job()?;
/// job.copy(
///     &Buffer::from_slice(&src, 64, 64, Format::Rgba8888)?,
///     &mut Buffer::from_slice_mut(&mut out, 64, 64, Format::Rgba8888)?,
/// )?;
/// drop(out);
/// job.submit()?;
/// # Ok(())
/// # }
/// ```
///
/// nor while an asynchronous submission is still in flight:
///
/// ```compile_fail
/// use edgefirst_rga::{buffer::Buffer, image::Format, rga::ImageManager};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let imgmgr = ImageManager::new()?;
/// let src = vec![0u8; 64 * 64 * 4];
/// let mut out = vec![0u8; 64 * 64 * 4];
///
/// let mut job = imgmgr.begin_job()?;
/// job.copy(
///     &Buffer::from_slice(&src, 64, 64, Format::Rgba8888)?,
///     &mut Buffer::from_slice_mut(&mut out, 64, 64, Format::Rgba8888)?,
/// )?;
/// let fence = job.submit_async()?;
/// drop(src);
/// fence.wait(None)?;
/// # Ok(())
/// # }
/// ```
pub struct Job<'m, 'b> {
    imgmgr: &'m ImageManager,
    handle: im_job_handle_t,
    tasks: usize,
    finished: bool,
    _buffers: PhantomData<&'b [u8]>,
}

impl<'m, 'b> Job<'m, 'b> {
    pub fn handle(&self) -> im_job_handle_t {
        self.handle
    }

    /// Number of tasks added so far.
    pub fn len(&self) -> usize {
        self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks == 0
    }

    /// Queues one `improcessTask`.
    fn task(
        &mut self,
        operation: &'static str,
        src: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        pattern: Option<&Buffer<'b>>,
        process: Process,
    ) -> Result<&mut Self> {
        if !dst.is_writable() {
            return Err(Error::ReadOnly);
        }
        let mut opt = self.imgmgr.options(&process);
        trace!(
            operation,
            job = self.handle,
            usage = format_args!("{:#x}", process.usage),
            ?opt,
            "improcessTask"
        );
        let status = unsafe {
            self.imgmgr.lib().improcessTask(
                self.handle,
                src.raw(),
                dst.raw(),
                pattern.map(Buffer::raw).unwrap_or_default(),
                process.src_rect.into(),
                process.dst_rect.into(),
                im_rect::default(),
                &mut opt,
                process.usage,
            )
        };
        let status = status.ok_or(Error::Unsupported {
            feature: "job API",
            required: JOB_API_VERSION,
        })?;
        self.imgmgr.check_status(operation, status)?;
        self.tasks += 1;
        Ok(self)
    }

    pub fn copy(&mut self, src: &Buffer<'b>, dst: &mut Buffer<'b>) -> Result<&mut Self> {
        self.task("imcopyTask", src, dst, None, Process::default())
    }

    /// Scales the whole of `src` onto the whole of `dst`, see
    /// [`ImageManager::resize`].
    pub fn resize(
        &mut self,
        src: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        fx: f64,
        fy: f64,
    ) -> Result<&mut Self> {
        let process = Process::resize(src, dst, fx, fy)?;
        self.task("imresizeTask", src, dst, None, process)
    }

    pub fn rescale(
        &mut self,
        src: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        fx: f64,
        fy: f64,
    ) -> Result<&mut Self> {
        let process = Process::rescale(src, dst, fx, fy)?;
        self.task("imrescaleTask", src, dst, None, process)
    }

    pub fn crop(&mut self, src: &Buffer<'b>, dst: &mut Buffer<'b>, rect: Rect) -> Result<&mut Self> {
        let process = Process::crop(src, rect)?;
        self.task("imcropTask", src, dst, None, process)
    }

    pub fn rotate(
        &mut self,
        src: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        rotation: Rotation,
    ) -> Result<&mut Self> {
        self.task("imrotateTask", src, dst, None, Process::usage(rotation as c_int))
    }

    pub fn flip(&mut self, src: &Buffer<'b>, dst: &mut Buffer<'b>, mode: Flip) -> Result<&mut Self> {
        self.task("imflipTask", src, dst, None, Process::usage(mode as c_int))
    }

    /// Moves the content of `src` right and down, see
    /// [`ImageManager::translate`].
    pub fn translate(
        &mut self,
        src: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        x: i32,
        y: i32,
    ) -> Result<&mut Self> {
        let process = Process::translate(src, dst, x, y)?;
        self.task("imtranslateTask", src, dst, None, process)
    }

    /// Blends `fg` over `bg`, writing into `bg`.
    pub fn blend(&mut self, fg: &Buffer<'b>, bg: &mut Buffer<'b>, mode: BlendMode) -> Result<&mut Self> {
        self.task("imblendTask", fg, bg, None, Process::usage(mode as c_int))
    }

    /// Blends `a` over `b` into `dst`.
    pub fn composite(
        &mut self,
        a: &Buffer<'b>,
        b: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        mode: BlendMode,
    ) -> Result<&mut Self> {
        self.task("imcompositeTask", a, dst, Some(b), Process::usage(mode as c_int))
    }

    pub fn convert_color(
        &mut self,
        src: &Buffer<'b>,
        dst: &mut Buffer<'b>,
        src_format: Format,
        dst_format: Format,
    ) -> Result<&mut Self> {
        let src = src.reformatted(src_format)?;
        let mut dst = dst.reformatted(dst_format)?;
        self.task("imcvtcolorTask", &src, &mut dst, None, Process::default())
    }

    pub fn fill(&mut self, dst: &mut Buffer<'b>, rect: Rect, color: u32) -> Result<&mut Self> {
        let process = Process::fill(dst, rect, color)?;
        self.task("imfillTask", &Buffer::empty(), dst, None, process)
    }

    /// Submits the job and waits for the hardware to finish.
    pub fn submit(mut self) -> Result<()> {
        self.finished = true;
        let status = unsafe {
            self.imgmgr
                .lib()
                .imendJob(self.handle, IM_SYNC, -1, std::ptr::null_mut())
        };
        debug!("RGA job {} submitted with {} tasks", self.handle, self.tasks);
        self.ended("imendJob", status)
    }

    /// Submits the job without waiting.  The returned fence signals when
    /// the hardware has finished, and keeps the job's buffers borrowed
    /// until then.
    pub fn submit_async(mut self) -> Result<Fence<'b>> {
        self.finished = true;
        let mut release_fence: c_int = -1;
        let status = unsafe {
            self.imgmgr
                .lib()
                .imendJob(self.handle, IM_ASYNC, -1, &mut release_fence)
        };
        self.ended("imendJob", status)?;
        debug!(
            "RGA job {} submitted asynchronously, fence {}",
            self.handle, release_fence
        );
        let fd = (release_fence >= 0).then(|| unsafe { OwnedFd::from_raw_fd(release_fence) });
        Ok(Fence::new(fd))
    }

    /// Discards the job and every task added to it.
    pub fn cancel(mut self) -> Result<()> {
        self.finished = true;
        let status = unsafe { self.imgmgr.lib().imcancelJob(self.handle) };
        debug!("RGA job {} cancelled", self.handle);
        self.ended("imcancelJob", status)
    }

    fn ended(&self, operation: &'static str, status: Option<IM_STATUS>) -> Result<()> {
        let status = status.ok_or(Error::Unsupported {
            feature: "job API",
            required: JOB_API_VERSION,
        })?;
        self.imgmgr.check_status(operation, status)
    }
}

impl Drop for Job<'_, '_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let status = unsafe { self.imgmgr.lib().imcancelJob(self.handle) };
        if let Err(e) = self.ended("imcancelJob", status) {
            warn!("failed to cancel RGA job {}: {}", self.handle, e);
        } else {
            debug!("RGA job {} dropped without submission", self.handle);
        }
    }
}

/// Release fence of an asynchronously submitted job.
///
/// Holds the borrow of the job's buffers.  Dropping a pending fence blocks
/// until the hardware has finished with them.
#[derive(Debug)]
pub struct Fence<'b> {
    fd: Option<OwnedFd>,
    _buffers: PhantomData<&'b [u8]>,
}

impl Fence<'_> {
    fn new(fd: Option<OwnedFd>) -> Self {
        Fence {
            fd,
            _buffers: PhantomData,
        }
    }

    /// False when the library completed the job without handing out a
    /// fence, in which case [`Fence::wait`] returns immediately.
    pub fn is_pending(&self) -> bool {
        self.fd.is_some()
    }

    /// Blocks until the job completes or `timeout` elapses.
    ///
    /// On timeout the fence is dropped, which waits for completion
    /// without a limit before the buffers are released.
    pub fn wait(mut self, timeout: Option<Duration>) -> Result<()> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };
        if let Err(e) = wait_fd(&fd, timeout) {
            self.fd = Some(fd);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for Fence<'_> {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            debug!("waiting on RGA fence {} before releasing buffers", fd.as_raw_fd());
            if let Err(e) = wait_fd(&fd, None) {
                warn!("RGA fence {} failed: {}", fd.as_raw_fd(), e);
            }
        }
    }
}

/// Waits for a sync_file fence to signal.
fn wait_fd(fd: &OwnedFd, timeout: Option<Duration>) -> Result<()> {
    let timeout_ms = match timeout {
        Some(t) => c_int::try_from(t.as_millis()).unwrap_or(c_int::MAX),
        None => -1,
    };
    let mut pfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    loop {
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        match ret {
            0 => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "RGA fence did not signal",
                )))
            }
            n if n > 0 => {
                if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                    return Err(Error::Io(io::Error::other("RGA fence error")));
                }
                return Ok(());
            }
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(Error::Io(err));
                }
            }
        }
    }
}
