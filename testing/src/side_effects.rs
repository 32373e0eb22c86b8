//! Recording mocks for the invoice and notification side effects.

use async_trait::async_trait;
use hotdesk_core::gateway::{Invoicer, Notification, Notifier, SideEffectError};
use hotdesk_core::types::{BookingId, Money};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock invoicer that records issued invoices and can be told to fail.
#[derive(Clone, Default)]
pub struct MockInvoicer {
    issued: Arc<Mutex<Vec<(BookingId, Money)>>>,
    fail: Arc<AtomicBool>,
}

impl MockInvoicer {
    /// Create a mock that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all following invoice calls fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Invoices issued so far.
    pub async fn issued(&self) -> Vec<(BookingId, Money)> {
        self.issued.lock().await.clone()
    }
}

#[async_trait]
impl Invoicer for MockInvoicer {
    async fn issue_invoice(
        &self,
        booking_id: BookingId,
        amount: Money,
        _currency: &str,
    ) -> Result<String, SideEffectError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SideEffectError("mock invoicer failure".to_string()));
        }
        self.issued.lock().await.push((booking_id, amount));
        Ok(format!("https://invoices.test/{booking_id}"))
    }
}

/// Mock notifier that records every notification and can be told to fail.
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    /// Create a mock that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all following notify calls fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Notifications recorded so far.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), SideEffectError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SideEffectError("mock notifier failure".to_string()));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
