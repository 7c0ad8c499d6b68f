use rand::Rng;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

const NO_PUNCHLINE: &str = "That's the joke!";

const BUILTIN_JOKES: [&str; 5] = [
    "Why did the chicken cross the road?To get to the other side.",
    "What do you call a fish with no eyes?A fsh.",
    "Why don't skeletons fight each other?They don't have the guts.",
    "What do you call a bear with no teeth?A gummy bear.",
    "Why did the scarecrow win an award?Because he was outstanding in his field.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Joke {
    pub setup: String,
    pub punchline: String,
}

impl Joke {
    /// Split at the first `?`; the setup keeps it. Lines without one are all
    /// setup.
    pub fn parse(line: &str) -> Joke {
        match line.split_once('?') {
            Some((setup, rest)) => Joke {
                setup: format!("{setup}?"),
                punchline: rest.trim().to_string(),
            },
            None => Joke {
                setup: line.to_string(),
                punchline: NO_PUNCHLINE.to_string(),
            },
        }
    }
}

pub struct JokeBook {
    jokes: Vec<Joke>,
    from_file: bool,
}

impl JokeBook {
    pub fn from_text(text: &str) -> JokeBook {
        let jokes = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Joke::parse)
            .collect();
        JokeBook {
            jokes,
            from_file: true,
        }
    }

    pub fn builtin() -> JokeBook {
        JokeBook {
            jokes: BUILTIN_JOKES.iter().map(|l| Joke::parse(l)).collect(),
            from_file: false,
        }
    }

    /// Jokes from `path`, or the built-in set when there is no such file.
    /// A file that exists but can't be read gives an empty book.
    pub fn load(path: &Path) -> JokeBook {
        if !path.is_file() {
            warn!(path = %path.display(), "jokes file not found; using built-in jokes");
            return JokeBook::builtin();
        }
        match std::fs::read(path) {
            Ok(bytes) => {
                let book = JokeBook::from_text(&String::from_utf8_lossy(&bytes));
                info!(path = %path.display(), count = book.len(), "loaded jokes");
                book
            }
            Err(e) => {
                warn!(path = %path.display(), "failed to read jokes: {e}");
                JokeBook {
                    jokes: Vec::new(),
                    from_file: true,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.jokes.len()
    }

    pub fn from_file(&self) -> bool {
        self.from_file
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Joke> {
        if self.jokes.is_empty() {
            return None;
        }
        self.jokes.get(rng.random_range(0..self.jokes.len()))
    }
}
