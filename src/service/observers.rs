use std::cell::RefCell;
use std::rc::Rc;

use crate::models::NetworkAnchor;

pub type ConnectionObserver = Rc<dyn Fn(bool)>;
pub type AnchorObserver = Rc<dyn Fn(Option<&NetworkAnchor>)>;
pub type BroadcastObserver = Rc<dyn Fn(u8, &str, &[i32])>;
pub type DebugObserver = Rc<dyn Fn(&str, i32)>;

/// Synchronous observer lists.
///
/// Callbacks run on the service thread with no service state borrowed, so
/// they may call back into the service.
#[derive(Default)]
pub(crate) struct Observers {
    connection: RefCell<Vec<ConnectionObserver>>,
    anchor: RefCell<Vec<AnchorObserver>>,
    broadcast: RefCell<Vec<BroadcastObserver>>,
    debug: RefCell<Vec<DebugObserver>>,
}

impl Observers {
    pub fn add_connection(&self, observer: ConnectionObserver) {
        self.connection.borrow_mut().push(observer);
    }

    pub fn add_anchor(&self, observer: AnchorObserver) {
        self.anchor.borrow_mut().push(observer);
    }

    pub fn add_broadcast(&self, observer: BroadcastObserver) {
        self.broadcast.borrow_mut().push(observer);
    }

    pub fn add_debug(&self, observer: DebugObserver) {
        self.debug.borrow_mut().push(observer);
    }

    pub fn connection_changed(&self, connected: bool) {
        let observers = self.connection.borrow().clone();
        for observer in observers {
            observer(connected);
        }
    }

    pub fn anchor_changed(&self, anchor: Option<&NetworkAnchor>) {
        let observers = self.anchor.borrow().clone();
        for observer in observers {
            observer(anchor);
        }
    }

    pub fn broadcast(&self, code: u8, json: &str, targets: &[i32]) {
        let observers = self.broadcast.borrow().clone();
        if observers.is_empty() {
            tracing::warn!("No transport attached; dropping outbound event {}", code);
        }
        for observer in observers {
            observer(code, json, targets);
        }
    }

    pub fn debug(&self, message: &str, code: i32) {
        let observers = self.debug.borrow().clone();
        for observer in observers {
            observer(message, code);
        }
    }
}
