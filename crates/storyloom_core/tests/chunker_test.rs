use storyloom_core::{ends_sentence, split};

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sentences(count: usize, words_each: usize) -> String {
    (0..count)
        .map(|s| {
            let mut words: Vec<String> = (0..words_each - 1).map(|w| format!("w{s}x{w}")).collect();
            words.push(format!("end{s}."));
            words.join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn concatenation_reproduces_input() {
    let inputs = [
        "  Leading space. And\ttabs\n\nand newlines!  Trailing  ",
        "No terminator anywhere in this text at all",
        "Short. Sentences. Everywhere. Here.",
        "",
    ];
    for input in inputs {
        for max in [1, 2, 3, 7, 100] {
            let chunks = split(input, max);
            assert_eq!(normalize(&chunks.join(" ")), normalize(input), "max={max}");
            assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        }
    }
}

#[test]
fn boundaries_fall_on_terminators_except_last() {
    let text = "The cat sat. It was warm, and sunny! Was it? \"Yes,\" she said. Then rain";
    for max in 1..=6 {
        let chunks = split(text, max);
        for chunk in &chunks[..chunks.len() - 1] {
            let last = chunk.split_whitespace().last().unwrap();
            assert!(ends_sentence(last), "chunk {chunk:?} ends mid-sentence");
        }
    }
}

#[test]
fn closing_quotes_count_as_terminated() {
    let chunks = split("He said \"stop.\" Then left. Fine", 2);
    assert_eq!(chunks, vec!["He said \"stop.\"", "Then left.", "Fine"]);
}

#[test]
fn long_stretch_without_terminator_stays_whole() {
    let text = "a b c d e f g h i j k l m n o p";
    let chunks = split(text, 3);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0], text);
}

#[test]
fn thousand_fifty_words_make_three_chunks() {
    let text = sentences(105, 10);
    assert_eq!(text.split_whitespace().count(), 1050);
    let chunks = split(&text, 500);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].split_whitespace().count(), 500);
    assert_eq!(chunks[1].split_whitespace().count(), 500);
    assert_eq!(chunks[2].split_whitespace().count(), 50);
}

#[test]
fn window_extends_to_next_terminator() {
    let text = sentences(3, 7);
    let chunks = split(&text, 5);
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.split_whitespace().count() == 7));
}

#[test]
fn empty_and_whitespace_input_yield_nothing() {
    assert!(split("", 10).is_empty());
    assert!(split(" \n\t ", 10).is_empty());
}
