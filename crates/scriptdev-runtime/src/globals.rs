//! Host entry points installed into every session's engine.
//!
//! - `iointr(name, value)` pushes a value to the interrupt registry
//! - `iointr(name)` reads the last pushed value back
//! - `print` and `debug` output is routed into the log

use std::sync::Arc;

use rhai::{Dynamic, Engine, ImmutableString, Position};

use crate::convert::{from_dynamic, to_dynamic};
use crate::interrupt::InterruptRegistry;

/// Log target for output produced by scripts themselves
pub const SCRIPT_LOG_TARGET: &str = "scriptdev::script";

pub(crate) fn install(engine: &mut Engine, interrupts: Arc<InterruptRegistry>) {
    install_output(engine);
    install_iointr(engine, interrupts);
}

fn install_output(engine: &mut Engine) {
    engine.on_print(|text| {
        tracing::info!(target: SCRIPT_LOG_TARGET, "{}", text);
    });

    engine.on_debug(|text, source, pos: Position| match source {
        Some(source) => tracing::debug!(target: SCRIPT_LOG_TARGET, "{} @ {}:{}", text, source, pos),
        None if pos.is_none() => tracing::debug!(target: SCRIPT_LOG_TARGET, "{}", text),
        None => tracing::debug!(target: SCRIPT_LOG_TARGET, "{} @ {}", text, pos),
    });
}

fn install_iointr(engine: &mut Engine, interrupts: Arc<InterruptRegistry>) {
    let registry = interrupts.clone();
    engine.register_fn("iointr", move |name: ImmutableString, value: Dynamic| -> bool {
        let type_name = value.type_name();
        match from_dynamic(value) {
            Some(value) => registry.push(name.as_str(), value),
            None => {
                tracing::warn!(
                    "[iointr:{}] Value of type {} cannot be pushed",
                    name,
                    type_name
                );
                false
            }
        }
    });

    let registry = interrupts;
    engine.register_fn("iointr", move |name: ImmutableString| -> Dynamic {
        to_dynamic(&registry.read(name.as_str()))
    });
}
