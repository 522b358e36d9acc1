//! `setTimeout` backed scheduler.

use std::time::Duration;

use blocks_editor_core::Scheduler;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

/// Runs deferred tasks through `window.setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let Some(window) = web_sys::window() else {
            tracing::warn!("no window, running deferred task now");
            task();
            return;
        };
        let closure = Closure::once(move || task());
        let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            timeout,
        ) {
            tracing::warn!(?err, "setTimeout failed");
            return;
        }
        closure.forget();
    }
}
