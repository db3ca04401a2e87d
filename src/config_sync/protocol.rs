//! # Config Sync Responder
//!
//! Answers configuration requests against a [`VariableRegistry`].
//!
//! ```text
//! NONE ──► READ ────────► READ_RETURN
//!     ├──► WRITE ───────► WRITE_RETURN
//!     └──► SET_DEFAULT ─► SET_DEFAULT_RETURN
//! ```
//!
//! One request produces exactly one reply. Slots the responder cannot serve
//! (unregistered variable, access denied) come back as `VariableId::NONE`
//! with a zero value; there is no separate error channel.

use tracing::debug;

use super::registry::VariableRegistry;
use crate::radio::protocol::{ConfigMessage, ConfigOperation, MultiConfigMessage, CONFIG_SLOTS};
use crate::variable::VariableId;

/// Build the reply to a multi config request
///
/// # Arguments
///
/// * `registry` - Variables exposed by this endpoint
/// * `request` - Incoming request
///
/// # Returns
///
/// * `Option<MultiConfigMessage>` - Reply with `operation` advanced to the
///   matching `*_RETURN`, or `None` if `request` is not a request
///   (`NONE` or a `*_RETURN` arriving at the responder)
pub fn respond_multi(registry: &mut VariableRegistry, request: MultiConfigMessage) -> Option<MultiConfigMessage> {
    let reply_operation = request.operation.reply()?;
    let mut reply = request;

    for i in 0..CONFIG_SLOTS {
        let id = reply.variables[i];
        if id.is_none() {
            continue;
        }

        match serve_slot(registry, request.operation, id, reply.values[i]) {
            Some(value) => reply.values[i] = value,
            None => {
                reply.variables[i] = VariableId::NONE;
                reply.values[i] = 0;
            }
        }
    }

    reply.operation = reply_operation;
    debug!(
        "Config {:?} answered: {} of {} slots served",
        request.operation,
        reply.slots().count(),
        request.slots().count()
    );
    Some(reply)
}

/// Build the reply to a single-variable config request
///
/// Served exactly like a one-slot multi config request.
pub fn respond_single(registry: &mut VariableRegistry, request: ConfigMessage) -> Option<ConfigMessage> {
    let mut multi = MultiConfigMessage {
        operation: request.operation,
        ..Default::default()
    };
    multi.variables[0] = request.variable;
    multi.values[0] = request.value;

    let reply = respond_multi(registry, multi)?;
    Some(ConfigMessage {
        operation: reply.operation,
        variable: reply.variables[0],
        value: reply.values[0],
    })
}

/// Perform one slot of a request, `None` if the variable is unavailable
fn serve_slot(registry: &mut VariableRegistry, operation: ConfigOperation, id: VariableId, value: u32) -> Option<u32> {
    let access = registry.descriptor(id)?.access;

    match operation {
        ConfigOperation::Read | ConfigOperation::ReadReturn if access.can_read() => registry.read_raw(id),
        ConfigOperation::Write | ConfigOperation::WriteReturn if access.can_write() => registry.write_raw(id, value),
        ConfigOperation::SetDefault if access.can_write() => registry.reset_default(id),
        _ => {
            debug!("Access to {} denied for {:?}", id, operation);
            None
        }
    }
}
