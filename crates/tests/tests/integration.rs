//! Integration tests for end-to-end circuit simulation.
//!
//! These tests verify the full pipeline:
//! Build circuit → Analyse → Initialize → Drive inputs → Verify

use digital_kernel::analysis::{self, DependencyAnalyser, PathLenAnalyser};
use digital_kernel::gates::LogicOp;
use digital_kernel::{Error, ModelConfig, ModelEvent, Value};
use digital_tests::TestHarness;

fn full_adder() -> TestHarness {
    let mut h = TestHarness::new();
    h.input("A", 1);
    h.input("B", 1);
    h.input("Cin", 1);
    h.gate(LogicOp::Xor, &["A", "B"], "AxB");
    h.gate(LogicOp::Xor, &["AxB", "Cin"], "S");
    h.gate(LogicOp::And, &["A", "B"], "AB");
    h.gate(LogicOp::And, &["AxB", "Cin"], "CxAB");
    h.gate(LogicOp::Or, &["AB", "CxAB"], "Cout");
    h.output("S");
    h.output("Cout");
    h
}

/// A 2-input AND settles every transition in a single microstep.
#[test]
fn test_and_gate_end_to_end() {
    let mut h = TestHarness::new();
    h.input("A", 1);
    h.input("B", 1);
    h.gate(LogicOp::And, &["A", "B"], "Y");
    h.init();

    h.set("A", 1);
    h.set("B", 0);
    h.step();
    assert_eq!(h.get("Y"), 0);

    assert_eq!(h.apply("B", 1), 1);
    assert_eq!(h.get("Y"), 1);

    assert_eq!(h.apply("A", 0), 1);
    assert_eq!(h.get("Y"), 0);
}

/// Once settled, further steps change nothing and schedule nothing.
#[test]
fn test_full_adder_is_idempotent_after_settling() {
    let mut h = full_adder();
    h.init();

    for input in 0..8u64 {
        h.set("A", input & 1);
        h.set("B", (input >> 1) & 1);
        h.set("Cin", (input >> 2) & 1);
        h.step();

        let total = (input & 1) + ((input >> 1) & 1) + ((input >> 2) & 1);
        let (s, cout) = (h.get("S"), h.get("Cout"));
        assert_eq!(s, total & 1, "sum for {input:03b}");
        assert_eq!(cout, total >> 1, "carry for {input:03b}");

        for _ in 0..3 {
            assert!(!h.model().needs_update());
            assert_eq!(h.step(), 0);
            assert_eq!((h.get("S"), h.get("Cout")), (s, cout));
        }
    }
}

#[test]
fn test_same_value_notifies_once() {
    let mut h = TestHarness::new();
    h.input("A", 8);
    let log = h.record("A");
    h.set("A", 0x42);
    h.set("A", 0x42);
    assert_eq!(*log.lock().unwrap(), vec![Value::new(0x42, 8)]);
}

#[test]
fn test_writes_are_masked_to_width() {
    let mut h = TestHarness::new();
    for bits in 1..=64u8 {
        h.wire(&format!("w{bits}"), bits);
    }
    for raw in [u64::MAX, 0xdead_beef_cafe_f00d, 1 << 63, 0x5555] {
        for bits in 1..=64u8 {
            let name = format!("w{bits}");
            h.set(&name, raw);
            let mask = if bits == 64 { u64::MAX } else { (1 << bits) - 1 };
            assert_eq!(h.get(&name), raw & mask, "{bits} bits");
        }
    }
}

/// The XOR reads A and not(A) in the same microstep and has to see the
/// inverter's previous output, so it glitches for one microstep.
#[test]
fn test_phase_separation_shows_glitch() {
    let mut h = TestHarness::new();
    h.input("A", 1);
    h.not("A", "nA");
    h.gate(LogicOp::Xor, &["A", "nA"], "Y");
    h.init();
    assert_eq!(h.get("Y"), 1);

    let log = h.record("Y");
    assert_eq!(h.apply("A", 1), 2);
    let seen: Vec<u64> = log.lock().unwrap().iter().map(Value::value).collect();
    assert_eq!(seen, vec![0, 1]);
}

#[test]
fn test_ring_of_inverters_is_a_cycle() {
    let mut h = TestHarness::new();
    h.input("A", 1);
    h.not("A", "B");
    h.not("B", "C");
    // close the ring back onto A
    let (c, a) = (h.id("C"), h.id("A"));
    let not = digital_kernel::gates::Not::new(h.model(), c, a).unwrap();
    h.add(not);

    let roots = [h.signal("A")];
    assert!(analysis::has_circles(h.model(), &roots).unwrap());
    assert!(matches!(
        analysis::check_for_cycles(h.model(), &roots),
        Err(Error::CycleDetected { ref nodes }) if nodes.len() == 3
    ));
}

#[test]
fn test_ring_through_flip_flop_is_not_a_cycle() {
    let mut h = TestHarness::new();
    h.input("A", 1);
    h.input("CLK", 1);
    h.not("A", "B");
    h.not("B", "C");
    h.flip_flop("C", "CLK", "A", "nQ");

    let roots = [h.signal("A"), h.signal("CLK")];
    assert!(!analysis::has_circles(h.model(), &roots).unwrap());
    analysis::check_for_cycles(h.model(), &roots).unwrap();
}

#[test]
fn test_outputs_depend_only_on_their_own_chain() {
    let mut h = TestHarness::new();
    h.input("A", 1);
    h.input("B", 1);
    h.not("A", "nA");
    h.not("nA", "X");
    h.not("B", "Y");
    h.output("X");
    h.output("Y");

    let da = DependencyAnalyser::new(h.model()).unwrap();
    assert_eq!(da.get_inputs(&h.signal("X")), vec![h.signal("A")]);
    assert_eq!(da.get_inputs(&h.signal("Y")), vec![h.signal("B")]);
}

#[test]
fn test_full_adder_dependencies() {
    let h = full_adder();
    let da = DependencyAnalyser::new(h.model()).unwrap();
    assert_eq!(da.get_inputs(&h.signal("S")).len(), 3);
    assert_eq!(da.get_inputs(&h.signal("Cout")).len(), 3);
    assert_eq!(da.get_inputs(&h.signal("AB")), vec![h.signal("A"), h.signal("B")]);
}

#[test]
fn test_path_length_of_chain_with_splitter() {
    let mut h = TestHarness::new();
    h.input("IN", 4);
    h.not("IN", "n1");
    h.not("n1", "n2");
    h.not("n2", "n3");
    assert_eq!(PathLenAnalyser::new(h.model()).unwrap().max_path_len(), 3);

    h.splitter("n3", 1, 2, "slice");
    h.not("slice", "n4");
    assert_eq!(PathLenAnalyser::new(h.model()).unwrap().max_path_len(), 4);
}

#[test]
fn test_full_adder_path_length() {
    let h = full_adder();
    // A -> XOR -> AND -> OR
    assert_eq!(PathLenAnalyser::new(h.model()).unwrap().max_path_len(), 3);
}

#[test]
fn test_unstable_circuit_fails_within_bound() {
    let mut h = TestHarness::with_config(ModelConfig {
        max_microsteps: 50,
        oscillation_collect_window: 10,
        ..ModelConfig::default()
    });
    h.input("EN", 1);
    h.wire("A", 1);
    h.gate(LogicOp::And, &["EN", "A"], "X");
    let (x, a) = (h.id("X"), h.id("A"));
    let not = digital_kernel::gates::Not::new(h.model(), x, a).unwrap();
    h.add(not);
    h.init();

    h.set("EN", 1);
    let err = h.model_mut().do_step(false).unwrap_err();
    let Error::Oscillation { microsteps, ref nodes } = err else {
        panic!("expected oscillation");
    };
    assert_eq!(microsteps, 60);
    assert_eq!(nodes.len(), 2);
    let message = h.model().describe_error(&err);
    assert!(message.contains("AND") && message.contains("NOT"), "{message}");
}

#[test]
fn test_two_bit_counter() {
    let mut h = TestHarness::new();
    h.input("CLK", 1);
    h.wire("Q0", 1);
    h.wire("Q1", 1);
    h.wire("nQ0", 1);
    h.gate(LogicOp::Xor, &["Q1", "Q0"], "D1");
    h.flip_flop("nQ0", "CLK", "Q0", "nQ0");
    h.flip_flop("D1", "CLK", "Q1", "nQ1");
    h.init();

    let roots = [h.signal("CLK")];
    assert!(!analysis::has_circles(h.model(), &roots).unwrap());
    assert_eq!(h.model().stateful_nodes().len(), 2);

    let mut counts = Vec::new();
    for _ in 0..6 {
        h.clock("CLK");
        counts.push(h.get("Q1") << 1 | h.get("Q0"));
    }
    assert_eq!(counts, vec![1, 2, 3, 0, 1, 2]);
}

#[test]
fn test_tri_state_driver() {
    let mut h = TestHarness::new();
    h.input("A", 4);
    h.input("EN", 1);
    h.wire("BUS", 4);
    h.driver("A", "EN", "BUS");
    h.not("BUS", "nBUS");
    h.set("A", 0x3);
    h.set("EN", 1);
    h.init();
    assert_eq!(h.get("BUS"), 0x3);
    assert_eq!(h.get("nBUS"), 0xc);

    h.apply("A", 0x5);
    assert_eq!(h.get("BUS"), 0x5);
    assert_eq!(h.get("nBUS"), 0xa);

    // the driver releases the bus and the inverter reads a floating value
    h.set("EN", 0);
    let err = h.model_mut().do_step(false).unwrap_err();
    assert!(matches!(err, Error::HighZRead { node: Some(_), .. }));
    assert_eq!(h.snapshot("BUS"), Value::high_z(4));
}

#[test]
fn test_noise_runs_are_reproducible() {
    fn run(seed: u64) -> Vec<Value> {
        let mut h = TestHarness::with_config(ModelConfig {
            noise_seed: seed,
            ..ModelConfig::default()
        });
        h.input("A", 1);
        h.input("B", 1);
        h.not("A", "nA");
        h.gate(LogicOp::Xor, &["A", "nA"], "X");
        h.gate(LogicOp::Or, &["X", "B"], "Y");
        h.init_with_noise();
        let log = h.record("Y");
        for v in [1, 0, 1, 0] {
            h.set("A", v);
            h.model_mut().do_step(true).unwrap();
        }
        assert_eq!(h.get("Y"), 1);
        let seen = log.lock().unwrap().clone();
        seen
    }
    assert_eq!(run(3), run(3));
    assert_eq!(run(11), run(11));
}

#[test]
fn test_model_events_through_a_session() {
    use std::sync::{Arc, Mutex};

    let mut h = TestHarness::new();
    h.input("A", 1);
    h.not("A", "Y");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    h.model_mut().add_event_observer(
        &[
            ModelEvent::Started,
            ModelEvent::Step,
            ModelEvent::CheckBurn,
            ModelEvent::Closed,
        ],
        move |e| sink.lock().unwrap().push(e),
    );
    h.init();
    h.apply("A", 1);
    h.step();
    h.model_mut().close();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            ModelEvent::Step,
            ModelEvent::Started,
            ModelEvent::Step,
            ModelEvent::CheckBurn,
            ModelEvent::Closed,
        ]
    );
}
