//! pause, resume, threads, registers, modules

use chrono::SecondsFormat;
use xbdc_protocol::request::ThreadArgs;
use xbdc_protocol::response::{
    format_address, ModuleEntry, RegisterReport, RegisterValues, ResponsePayload, SectionEntry, SourceLocationEntry,
    ThreadEntry,
};
use xbdc_protocol::{CommandType, Response};

use super::{select_thread, Dispatcher};
use crate::error::{Result, XbdcError};
use crate::types::{Address, ThreadContext};

const NO_THREADS: &str = "No threads found in the process.";

impl Dispatcher
{
    pub(super) fn pause(&mut self) -> Result<Response>
    {
        let reply = self.session_mut()?.device().stop()?;
        Ok(if reply.success {
            Response::success(CommandType::Pause, "Execution paused.")
        } else {
            Response::failure(CommandType::Pause, reply.message)
        })
    }

    pub(super) fn resume(&mut self) -> Result<Response>
    {
        let reply = self.session_mut()?.device().go()?;
        Ok(if reply.success {
            Response::success(CommandType::Resume, "Execution continued.")
        } else {
            Response::failure(CommandType::Resume, reply.message)
        })
    }

    pub(super) fn threads(&mut self) -> Result<Response>
    {
        let threads = self.session_mut()?.device().threads()?;
        if threads.is_empty() {
            return Ok(Response::failure(CommandType::Threads, NO_THREADS));
        }
        let entries = threads
            .into_iter()
            .map(|thread| ThreadEntry {
                id: thread.id,
                suspend_count: thread.suspend_count,
                priority: thread.priority,
                tls_base: thread.tls_base.to_string(),
                start: thread.start.to_string(),
                stack_base: thread.stack_base.to_string(),
                stack_limit: thread.stack_limit.to_string(),
                creation_time: thread.creation_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .collect();
        Ok(Response::with_payload(CommandType::Threads, None, ResponsePayload::Threads(entries)))
    }

    pub(super) fn registers(&mut self, args: &ThreadArgs) -> Result<Response>
    {
        let session = self.session.as_mut().ok_or(XbdcError::NotConnected)?;
        let device = session.device();
        let threads = device.threads()?;
        if threads.is_empty() {
            return Ok(Response::failure(CommandType::Registers, NO_THREADS));
        }
        let thread = select_thread(&threads, args.thread_id)?;
        let context = device.thread_context(thread.id)?;

        let location = self
            .symbols
            .source_location(Address::new(context.eip))
            .map(|location| SourceLocationEntry {
                file: location.file,
                line: location.line,
                function: location.function,
            });

        Ok(Response::with_payload(
            CommandType::Registers,
            None,
            ResponsePayload::Registers(RegisterReport {
                thread_id: thread.id,
                registers: register_values(&context),
                location,
            }),
        ))
    }

    pub(super) fn modules(&mut self) -> Result<Response>
    {
        let modules = self.session_mut()?.device().modules()?;
        if modules.is_empty() {
            return Ok(Response::failure(CommandType::Modules, "No modules found in the process."));
        }
        let entries = modules
            .into_iter()
            .map(|module| ModuleEntry {
                name: module.name,
                base_address: module.base_address.to_string(),
                size: module.size,
                checksum: format_address(module.checksum),
                timestamp: module.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                has_tls: module.has_tls,
                is_xbe: module.is_xbe,
                sections: module
                    .sections
                    .into_iter()
                    .map(|section| SectionEntry {
                        name: section.name,
                        base_address: section.base.to_string(),
                        size: section.size,
                        index: section.index,
                        flags: format_address(section.flags),
                    })
                    .collect(),
            })
            .collect();
        Ok(Response::with_payload(CommandType::Modules, None, ResponsePayload::Modules(entries)))
    }
}

fn register_values(context: &ThreadContext) -> RegisterValues
{
    RegisterValues {
        eax: format_address(context.eax),
        ebx: format_address(context.ebx),
        ecx: format_address(context.ecx),
        edx: format_address(context.edx),
        esi: format_address(context.esi),
        edi: format_address(context.edi),
        ebp: format_address(context.ebp),
        esp: format_address(context.esp),
        eip: format_address(context.eip),
        eflags: format_address(context.eflags),
        cs: format_address(context.seg_cs),
        ss: format_address(context.seg_ss),
    }
}
