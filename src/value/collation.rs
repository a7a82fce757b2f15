//! Text collation
//!
//! A single externally supplied comparison function orders text in sort
//! wrappers. Without one, text orders by raw bytes. The collator is
//! per-thread because views are single-threaded.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Text comparison function
pub type Collator = Rc<dyn Fn(&str, &str) -> Ordering>;

thread_local! {
    static COLLATOR: RefCell<Option<Collator>> = const { RefCell::new(None) };
}

/// Installs the collator used for text ordering on this thread.
pub fn install(collator: impl Fn(&str, &str) -> Ordering + 'static) {
    COLLATOR.with(|c| *c.borrow_mut() = Some(Rc::new(collator)));
}

/// Removes the installed collator.
pub fn reset() {
    COLLATOR.with(|c| *c.borrow_mut() = None);
}

/// Returns true if a collator is installed.
///
/// Index order is raw byte order, so backends decline native text ordering
/// while this is true.
pub fn is_installed() -> bool {
    COLLATOR.with(|c| c.borrow().is_some())
}

/// Compares two strings with the installed collator, or by bytes.
pub fn compare(a: &str, b: &str) -> Ordering {
    let collator = COLLATOR.with(|c| c.borrow().clone());
    match collator {
        Some(f) => f(a, b),
        None => a.as_bytes().cmp(b.as_bytes()),
    }
}
