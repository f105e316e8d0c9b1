//! Seed data: built-in course topics and a small offline question bank that
//! keeps the game playable without an OpenAI key.

use crate::domain::{McqQuestion, ProgrammingQuestion, Question};

/// Used when the player did not pick a course.
pub const DEFAULT_TOPIC: &str = "Basic Programming Concepts";

pub fn seed_topics() -> Vec<String> {
  ["Programming Basics", "Python Basics", "C Basics", "Java Data Structure Basics"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn mcq(question: &str, options: [&str; 4], correct: usize, explanation: &str) -> Question {
  Question::Mcq(McqQuestion {
    question: question.into(),
    options: options.iter().map(|s| s.to_string()).collect(),
    correct_answer_idx: correct,
    explanation: explanation.into(),
  })
}

fn fill_in(question: &str, code: &str, fragments: &[&str], sequence: &[&str], explanation: &str) -> Question {
  Question::Programming(ProgrammingQuestion {
    question: question.into(),
    code: code.into(),
    fragments: fragments.iter().map(|s| s.to_string()).collect(),
    correct_sequence: sequence.iter().map(|s| s.to_string()).collect(),
    explanation: explanation.into(),
  })
}

/// Built-in questions, tagged by topic. Topics without an exact match draw
/// from the general pool.
pub fn seed_questions() -> Vec<(&'static str, Question)> {
  vec![
    (DEFAULT_TOPIC, mcq(
      "What does a variable do in a program?",
      ["Stores a value under a name", "Repeats a block of code", "Ends the program", "Draws on the screen"],
      0,
      "A variable binds a name to a value so the program can use it later.",
    )),
    (DEFAULT_TOPIC, mcq(
      "Which structure runs a block of code repeatedly?",
      ["if statement", "loop", "comment", "import"],
      1,
      "Loops (for / while) repeat their body until a condition stops them.",
    )),
    (DEFAULT_TOPIC, mcq(
      "What is a function?",
      ["A type of error", "A named, reusable block of code", "A file format", "A hardware device"],
      1,
      "Functions package logic under a name so it can be called many times.",
    )),
    (DEFAULT_TOPIC, mcq(
      "Which value is a boolean?",
      ["\"true\"", "1.0", "true", "'t'"],
      2,
      "Booleans have exactly two values: true and false.",
    )),
    (DEFAULT_TOPIC, mcq(
      "What is the faster programming language?",
      ["Perl", "Python", "Swift", "C"],
      3,
      "C compiles ahead of time to native machine code with very little runtime overhead.",
    )),
    ("Python Basics", mcq(
      "Which keyword defines a function in Python?",
      ["func", "def", "function", "lambda"],
      1,
      "`def name(args):` starts a function definition.",
    )),
    ("Python Basics", fill_in(
      "Print every item of the list.",
      "for ___ in ___:\n    print(item)",
      &["item", "items", "range", "list"],
      &["item", "items"],
      "A for loop binds each element of the iterable to the loop variable.",
    )),
    ("Python Basics", mcq(
      "What does len([1, 2, 3]) return?",
      ["2", "3", "6", "None"],
      1,
      "len() counts the elements of a sequence.",
    )),
    ("C Basics", mcq(
      "Which function is the entry point of a C program?",
      ["start()", "init()", "main()", "run()"],
      2,
      "Execution of a hosted C program begins in main().",
    )),
    ("C Basics", fill_in(
      "Print the integer x.",
      "printf(___, ___);",
      &["\"%d\\n\"", "\"%s\\n\"", "x", "&x"],
      &["\"%d\\n\"", "x"],
      "%d formats an int; printf takes the value, not its address.",
    )),
    ("Java Data Structure Basics", mcq(
      "Which collection keeps keys unique and maps them to values?",
      ["ArrayList", "HashMap", "LinkedList", "Stack"],
      1,
      "A HashMap associates each unique key with one value.",
    )),
    ("Java Data Structure Basics", mcq(
      "What is the average lookup cost of a HashMap?",
      ["O(1)", "O(log n)", "O(n)", "O(n log n)"],
      0,
      "Hashing gives constant-time lookups on average.",
    )),
    ("Programming Basics", mcq(
      "What does the `==` operator usually do?",
      ["Assigns a value", "Compares two values for equality", "Adds two numbers", "Starts a comment"],
      1,
      "`=` assigns while `==` compares.",
    )),
  ]
}

/// Absolute last-resort question so a session never ends up with nothing to ask.
pub fn hard_fallback_question() -> Question {
  mcq(
    "Which of these is a programming language?",
    ["HTML", "Rust", "JPEG", "HTTP"],
    1,
    "Rust is a general-purpose programming language; the others are formats or protocols.",
  )
}
