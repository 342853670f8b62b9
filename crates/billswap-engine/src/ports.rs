//! Outbound ports to excluded collaborators.
//!
//! Notification, chat, and fee collection live outside the engine. Each is
//! a trait so tests and deployments substitute their own transport. Port
//! failures are secondary effects: the engine logs them and never rolls
//! back or blocks a committed transition.

use billswap_types::{EventPayload, SwapId, UserId};

/// Fire-and-forget user notification dispatch.
pub trait Notifier {
    /// Notify `user` about `event`. Errors are logged by the engine,
    /// never propagated.
    fn notify(&self, user: UserId, event: &EventPayload) -> Result<(), String>;
}

/// Chat/messaging collaborator. Invoked once per swap, on terms acceptance.
pub trait ChatGateway {
    /// Open a conversation between the two participants for this swap.
    fn open_conversation(&self, a: UserId, b: UserId, swap: SwapId) -> Result<(), String>;
}

/// Payment collaborator. The engine only requests collection and reacts
/// to the boolean fee-paid signal later; it never processes payment.
pub trait FeeCollector {
    /// Ask the payment collaborator to collect `amount_minor` from `user`.
    fn request_fee(&self, swap: SwapId, user: UserId, amount_minor: i64) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// Tracing-backed default implementations
// ---------------------------------------------------------------------------

/// Notifier that only logs. Default for tests and headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user: UserId, event: &EventPayload) -> Result<(), String> {
        tracing::info!(user = %user, kind = event.kind(), "notify");
        Ok(())
    }
}

/// Chat gateway that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChatGateway;

impl ChatGateway for LogChatGateway {
    fn open_conversation(&self, a: UserId, b: UserId, swap: SwapId) -> Result<(), String> {
        tracing::info!(a = %a, b = %b, swap = %swap, "open conversation");
        Ok(())
    }
}

/// Fee collector that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeeCollector;

impl FeeCollector for LogFeeCollector {
    fn request_fee(&self, swap: SwapId, user: UserId, amount_minor: i64) -> Result<(), String> {
        tracing::info!(swap = %swap, user = %user, amount_minor, "request fee");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_ports_always_succeed() {
        let user = UserId::new();
        let swap = SwapId::new();
        assert!(LogNotifier.notify(user, &EventPayload::SwapCompleted).is_ok());
        assert!(
            LogChatGateway
                .open_conversation(user, UserId::new(), swap)
                .is_ok()
        );
        assert!(LogFeeCollector.request_fee(swap, user, 99).is_ok());
    }
}
