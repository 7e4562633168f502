//! Short-lived toast messages.
use serde::Serialize;

use crate::constants::TOAST_LIFETIME_MS;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: u32,
    pub message: String,
    pub remaining_ms: f32,
}

/// External sink that mirrors every toast as it is raised.
pub trait Notifier {
    fn notify(&mut self, toast: &Toast);
}

/// Toasts ordered oldest first. Expiry runs on session time, not wall time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Toasts {
    items: Vec<Toast>,
    next_id: u32,
}

impl Toasts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) -> &Toast {
        self.next_id = self.next_id.wrapping_add(1);
        self.items.push(Toast {
            id: self.next_id,
            message: message.into(),
            remaining_ms: TOAST_LIFETIME_MS,
        });
        let last = self.items.len() - 1;
        &self.items[last]
    }

    pub fn advance(&mut self, dt_ms: f32) {
        for toast in &mut self.items {
            toast.remaining_ms -= dt_ms;
        }
        self.items.retain(|toast| toast.remaining_ms > 0.0);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Toast] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
