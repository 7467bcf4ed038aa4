use std::thread;

use celpp::{macros, Macro, ParserOptions, Preprocessor};

const INPUTS: &[(&str, &str)] = &[
    (r#"default(self.x, "DEF")"#, r#"has(self.x) ? self.x : "DEF""#),
    ("oneof(self.a, self.b)", "(has(self.a) ? 1 : 0) + (has(self.b) ? 1 : 0) <= 1"),
    ("self.index(x)", "has(self.x) ? self.x : null"),
    ("size(l) > 2 && l.all(e, e > 0)", "size(l) > 2 && l.all(e, e > 0)"),
];

#[test]
fn test_process_is_idempotent_on_its_output() {
    let pp = Preprocessor::new(macros::ALL.iter().copied()).unwrap();
    for (input, expected) in INPUTS {
        let once = pp.process(input).unwrap();
        assert_eq!(&once, expected);
        assert_eq!(pp.process(&once).unwrap(), once);
    }
}

#[test]
fn test_empty_registry_round_trips_canonical_text() {
    let pp = Preprocessor::new(Vec::<Macro>::new()).unwrap();
    for text in [
        "a + b * c",
        "!(a || b) ? [1, 2u, 3.5] : {\"k\": b\"\\001\"}",
        "x.y[0].z(1, 2) in m",
        "pkg.Type{f: -1}.f",
    ] {
        assert_eq!(pp.process(text).unwrap(), text);
    }
}

#[test]
fn test_shared_across_threads() {
    let pp = Preprocessor::new(macros::ALL.iter().copied()).unwrap();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pp = &pp;
                scope.spawn(move || {
                    let (input, expected) = INPUTS[i % INPUTS.len()];
                    for _ in 0..50 {
                        assert_eq!(pp.process(input).unwrap(), expected);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}

#[test]
fn test_options_are_honored() {
    let options = ParserOptions { expression_size_limit: 8, ..ParserOptions::default() };
    let pp = Preprocessor::with_options(macros::ALL.iter().copied(), options.clone()).unwrap();

    assert_eq!(pp.options(), &options);
    assert_eq!(pp.registry().len(), 4);
    assert!(pp.process("a + b").is_ok());
    assert!(pp.process("aaaa + bbbb").is_err());
}
