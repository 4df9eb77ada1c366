use proptest::prelude::*;

use irrigation_protocol::{LineAssembler, LogBuffer, PanelEvent, Severity, route_chunk, split_lines};

// --- Line splitting ---

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 :{}\"]{0,24}",
        Just(String::new()),
        Just("   ".to_string()),
        Just("\t\r".to_string()),
    ]
}

proptest! {
    #[test]
    fn split_keeps_every_non_blank_line(lines in prop::collection::vec(arb_line(), 0..20)) {
        let chunk = lines.join("\n");
        let expected: Vec<&str> = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        let got: Vec<&str> = split_lines(&chunk).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn split_never_yields_blank(chunk in "[ \t\r\na-z]{0,64}") {
        for line in split_lines(&chunk) {
            prop_assert!(!line.is_empty());
            prop_assert_eq!(line, line.trim());
        }
    }

    #[test]
    fn plain_text_lines_each_produce_one_log(words in prop::collection::vec("[a-z]{1,12}", 1..10)) {
        let chunk = words.join("\n");
        let events = route_chunk(&chunk);
        prop_assert_eq!(events.len(), words.len());
        for (event, word) in events.iter().zip(&words) {
            let expected = format!("ESP32: {word}");
            let is_raw_log = matches!(
                event,
                PanelEvent::Log { severity: Severity::Raw, message } if *message == expected
            );
            prop_assert!(is_raw_log);
        }
    }
}

// --- Reassembly ---

proptest! {
    #[test]
    fn assembler_is_split_invariant(text in "[a-z\n]{0,64}", cut in 0usize..64) {
        let cut = cut.min(text.len());
        let (head, tail) = text.split_at(cut);

        let mut assembler = LineAssembler::new();
        let mut joined = assembler.push(head);
        joined.push_str(&assembler.push(tail));
        joined.push_str(&assembler.flush());

        prop_assert_eq!(joined, text);
    }
}

// --- Log capacity ---

proptest! {
    #[test]
    fn log_never_exceeds_capacity(capacity in 1usize..200, pushes in 0usize..400) {
        let mut log = LogBuffer::with_capacity(capacity);
        for i in 0..pushes {
            log.push(Severity::Info, i.to_string());
            prop_assert!(log.len() <= capacity);
        }
        prop_assert_eq!(log.len(), pushes.min(capacity));
        if pushes > 0 {
            let newest = (pushes - 1).to_string();
            prop_assert_eq!(log.last().map(|e| e.message.as_str()), Some(newest.as_str()));
        }
    }
}
