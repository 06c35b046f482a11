use kernel_sync::{ExitSignal, OneShot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn waiter_blocks_until_publish() {
    let sig = Arc::new(ExitSignal::new());
    let returned = Arc::new(AtomicBool::new(false));

    let waiter = {
        let sig = Arc::clone(&sig);
        let returned = Arc::clone(&returned);
        thread::spawn(move || {
            let code = sig.wait();
            returned.store(true, Ordering::SeqCst);
            code
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!returned.load(Ordering::SeqCst), "waiter returned before publish");

    sig.publish(42).unwrap();
    assert_eq!(waiter.join().unwrap(), 42);
}

#[test]
fn value_is_retained_until_consumed() {
    let sig = ExitSignal::new();
    assert_eq!(format!("{sig:?}"), "OneShot { state: \"empty\", .. }");
    sig.publish(-3).unwrap();
    assert!(sig.is_published());
    assert_eq!(format!("{sig:?}"), "OneShot { state: \"ready\", .. }");

    // nobody waited yet; a late waiter still sees the code
    assert_eq!(sig.try_take(), Some(-3));
    assert_eq!(sig.try_take(), None);
    assert!(sig.wait_with(|| unreachable!()).is_none());
    assert_eq!(format!("{sig:?}"), "OneShot { state: \"taken\", .. }");
}

#[test]
fn second_publish_is_rejected() {
    let sig = OneShot::new();
    assert!(sig.publish(String::from("first")).is_ok());
    assert_eq!(sig.publish(String::from("second")), Err(String::from("second")));
    assert_eq!(sig.try_take().as_deref(), Some("first"));
}

#[test]
fn unconsumed_value_is_dropped_with_the_signal() {
    let payload = Arc::new(());
    {
        let sig = OneShot::new();
        sig.publish(Arc::clone(&payload)).unwrap();
        assert_eq!(Arc::strong_count(&payload), 2);
    }
    assert_eq!(Arc::strong_count(&payload), 1);
}

#[test]
fn wait_with_calls_relax_while_pending() {
    let sig = Arc::new(ExitSignal::new());
    let mut polls = 0_u32;
    let publisher = {
        let sig = Arc::clone(&sig);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sig.publish(9).unwrap();
        })
    };

    let code = sig.wait_with(|| {
        polls += 1;
        thread::yield_now();
    });
    publisher.join().unwrap();
    assert_eq!(code, Some(9));
    assert!(polls > 0);
}
