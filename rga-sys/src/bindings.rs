// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    im_handle_param_t, im_job_handle_t, im_opt_t, im_rect, rga_buffer_handle_t, rga_buffer_t,
    IM_CONFIG_NAME, IM_INFORMATION, IM_STATUS,
};
use libloading::Library;
use std::ffi::{c_char, c_int, OsStr};

/// Entry points of `librga`, resolved with `dlopen`.
///
/// The single-operation API (`improcess` and friends) is required.  The
/// buffer import and job APIs only exist in librga 1.9 and newer so they
/// are resolved optionally and their wrappers return `None` when missing.
///
/// Only symbols with C linkage are resolved.  The per-operation task
/// helpers (`imcopyTask`, `imfillTask`, ...) are C++ functions whose
/// exported names are mangled, so jobs are built on `improcessTask`.
pub struct rga {
    __library: Library,
    querystring: unsafe extern "C" fn(IM_INFORMATION) -> *const c_char,
    imStrError_t: unsafe extern "C" fn(IM_STATUS) -> *const c_char,
    imconfig: unsafe extern "C" fn(IM_CONFIG_NAME, u64) -> IM_STATUS,
    imcheck_t: unsafe extern "C" fn(
        rga_buffer_t,
        rga_buffer_t,
        rga_buffer_t,
        im_rect,
        im_rect,
        im_rect,
        c_int,
    ) -> IM_STATUS,
    improcess: unsafe extern "C" fn(
        rga_buffer_t,
        rga_buffer_t,
        rga_buffer_t,
        im_rect,
        im_rect,
        im_rect,
        c_int,
        *mut c_int,
        *mut im_opt_t,
        c_int,
    ) -> IM_STATUS,
    importbuffer_fd:
        Option<unsafe extern "C" fn(c_int, *mut im_handle_param_t) -> rga_buffer_handle_t>,
    releasebuffer_handle: Option<unsafe extern "C" fn(rga_buffer_handle_t) -> IM_STATUS>,
    imbeginJob: Option<unsafe extern "C" fn(u64) -> im_job_handle_t>,
    imendJob: Option<unsafe extern "C" fn(im_job_handle_t, c_int, c_int, *mut c_int) -> IM_STATUS>,
    imcancelJob: Option<unsafe extern "C" fn(im_job_handle_t) -> IM_STATUS>,
    improcessTask: Option<
        unsafe extern "C" fn(
            im_job_handle_t,
            rga_buffer_t,
            rga_buffer_t,
            rga_buffer_t,
            im_rect,
            im_rect,
            im_rect,
            *mut im_opt_t,
            c_int,
        ) -> IM_STATUS,
    >,
}

macro_rules! required {
    ($library:ident, $name:literal) => {
        *$library.get(concat!($name, "\0").as_bytes())?
    };
}

macro_rules! optional {
    ($library:ident, $name:literal) => {
        $library
            .get(concat!($name, "\0").as_bytes())
            .map(|sym| *sym)
            .ok()
    };
}

impl rga {
    /// Opens the library at `path` and resolves its symbols.
    ///
    /// # Safety
    ///
    /// Loading a shared library runs its initialisers.  The caller must
    /// ensure `path` names a genuine librga build whose ABI matches these
    /// declarations.
    pub unsafe fn new<P>(path: P) -> Result<Self, libloading::Error>
    where
        P: AsRef<OsStr>,
    {
        let library = Library::new(path)?;
        Self::from_library(library)
    }

    /// Resolves the symbols from an already opened library.
    ///
    /// # Safety
    ///
    /// See [`rga::new`].
    pub unsafe fn from_library<L>(library: L) -> Result<Self, libloading::Error>
    where
        L: Into<Library>,
    {
        let __library = library.into();
        let lib = &__library;
        let querystring = required!(lib, "querystring");
        let imStrError_t = required!(lib, "imStrError_t");
        let imconfig = required!(lib, "imconfig");
        let imcheck_t = required!(lib, "imcheck_t");
        let improcess = required!(lib, "improcess");
        let importbuffer_fd = optional!(lib, "importbuffer_fd");
        let releasebuffer_handle = optional!(lib, "releasebuffer_handle");
        let imbeginJob = optional!(lib, "imbeginJob");
        let imendJob = optional!(lib, "imendJob");
        let imcancelJob = optional!(lib, "imcancelJob");
        let improcessTask = optional!(lib, "improcessTask");

        Ok(Self {
            __library,
            querystring,
            imStrError_t,
            imconfig,
            imcheck_t,
            improcess,
            importbuffer_fd,
            releasebuffer_handle,
            imbeginJob,
            imendJob,
            imcancelJob,
            improcessTask,
        })
    }

    /// True when the library exports the job/task batching API.
    pub fn has_jobs(&self) -> bool {
        self.imbeginJob.is_some()
            && self.imendJob.is_some()
            && self.imcancelJob.is_some()
            && self.improcessTask.is_some()
    }

    /// True when the library exports the buffer handle import API.
    pub fn has_import(&self) -> bool {
        self.importbuffer_fd.is_some() && self.releasebuffer_handle.is_some()
    }

    pub unsafe fn querystring(&self, name: IM_INFORMATION) -> *const c_char {
        (self.querystring)(name)
    }

    pub unsafe fn imStrError_t(&self, status: IM_STATUS) -> *const c_char {
        (self.imStrError_t)(status)
    }

    pub unsafe fn imconfig(&self, name: IM_CONFIG_NAME, value: u64) -> IM_STATUS {
        (self.imconfig)(name, value)
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn imcheck_t(
        &self,
        src: rga_buffer_t,
        dst: rga_buffer_t,
        pat: rga_buffer_t,
        src_rect: im_rect,
        dst_rect: im_rect,
        pat_rect: im_rect,
        mode_usage: c_int,
    ) -> IM_STATUS {
        (self.imcheck_t)(src, dst, pat, src_rect, dst_rect, pat_rect, mode_usage)
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn improcess(
        &self,
        src: rga_buffer_t,
        dst: rga_buffer_t,
        pat: rga_buffer_t,
        srect: im_rect,
        drect: im_rect,
        prect: im_rect,
        acquire_fence_fd: c_int,
        release_fence_fd: *mut c_int,
        opt: *mut im_opt_t,
        usage: c_int,
    ) -> IM_STATUS {
        (self.improcess)(
            src,
            dst,
            pat,
            srect,
            drect,
            prect,
            acquire_fence_fd,
            release_fence_fd,
            opt,
            usage,
        )
    }

    pub unsafe fn importbuffer_fd(
        &self,
        fd: c_int,
        param: *mut im_handle_param_t,
    ) -> Option<rga_buffer_handle_t> {
        self.importbuffer_fd.map(|f| f(fd, param))
    }

    pub unsafe fn releasebuffer_handle(&self, handle: rga_buffer_handle_t) -> Option<IM_STATUS> {
        self.releasebuffer_handle.map(|f| f(handle))
    }

    pub unsafe fn imbeginJob(&self, flags: u64) -> Option<im_job_handle_t> {
        self.imbeginJob.map(|f| f(flags))
    }

    pub unsafe fn imendJob(
        &self,
        job: im_job_handle_t,
        sync_mode: c_int,
        acquire_fence_fd: c_int,
        release_fence_fd: *mut c_int,
    ) -> Option<IM_STATUS> {
        self.imendJob
            .map(|f| f(job, sync_mode, acquire_fence_fd, release_fence_fd))
    }

    pub unsafe fn imcancelJob(&self, job: im_job_handle_t) -> Option<IM_STATUS> {
        self.imcancelJob.map(|f| f(job))
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn improcessTask(
        &self,
        job: im_job_handle_t,
        src: rga_buffer_t,
        dst: rga_buffer_t,
        pat: rga_buffer_t,
        srect: im_rect,
        drect: im_rect,
        prect: im_rect,
        opt: *mut im_opt_t,
        usage: c_int,
    ) -> Option<IM_STATUS> {
        self.improcessTask
            .map(|f| f(job, src, dst, pat, srect, drect, prect, opt, usage))
    }
}
