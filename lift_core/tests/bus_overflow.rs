use lift_core::bus::{DEFAULT_CAPACITY, Queue};
use lift_core::{EventBus, MotorCommand};

#[test]
fn full_queue_drops_the_newest_message() {
    let q: Queue<u32> = Queue::bounded("test", DEFAULT_CAPACITY);
    let accepted: Vec<bool> = (0..11).map(|i| q.post(i)).collect();
    assert_eq!(accepted.iter().filter(|a| **a).count(), 10);
    assert!(!accepted[10]);
    assert_eq!(q.dropped(), 1);
    assert_eq!(q.drain(), (0..10).collect::<Vec<_>>());
}

#[test]
fn drops_are_totalled_across_queues() {
    let bus = EventBus::new(1);
    assert!(bus.motor.post(MotorCommand::Stop));
    assert!(!bus.motor.post(MotorCommand::Forward));
    assert!(!bus.motor.post(MotorCommand::Backward));
    assert_eq!(bus.dropped_total(), 2);
    assert_eq!(bus.motor.try_recv(), Some(MotorCommand::Stop));
    assert!(bus.motor.post(MotorCommand::Forward));
}
