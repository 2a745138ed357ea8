use super::*;
use std::sync::{Arc, Mutex};

fn recording(weight: i32, tag: &str, log: &Arc<Mutex<Vec<String>>>) -> Registration {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    Registration::new(
        weight,
        Box::new(move || {
            log.lock().unwrap().push(tag);
            Ok(())
        }),
    )
}

#[test]
fn drains_in_ascending_weight_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let regs = vec![
        recording(50, "fifty", &log),
        recording(10, "ten", &log),
        recording(100, "hundred", &log),
    ];

    for reg in drain_order(regs) {
        reg.release().unwrap();
    }

    assert_eq!(*log.lock().unwrap(), vec!["ten", "fifty", "hundred"]);
}

#[test]
fn equal_weights_keep_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let regs = vec![
        recording(10, "first", &log),
        recording(10, "second", &log),
        recording(5, "early", &log),
        recording(10, "third", &log),
    ];

    for reg in drain_order(regs) {
        reg.release().unwrap();
    }

    assert_eq!(
        *log.lock().unwrap(),
        vec!["early", "first", "second", "third"]
    );
}

#[test]
fn release_propagates_callback_error() {
    let reg = Registration::new(DEFAULT_WEIGHT, Box::new(|| Err("index writer jammed".into())));
    let err = reg.release().unwrap_err();
    assert_eq!(err.to_string(), "index writer jammed");
}
