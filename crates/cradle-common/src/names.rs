//! Random human-readable container names.
//!
//! Generated names follow the `adjective_surname` convention so that log
//! output stays readable when the caller does not supply a name.

const ADJECTIVES: &[&str] = &[
    "admiring",
    "adoring",
    "bold",
    "brave",
    "clever",
    "cool",
    "dazzling",
    "determined",
    "eager",
    "elated",
    "festive",
    "focused",
    "gallant",
    "gifted",
    "happy",
    "hopeful",
    "inspiring",
    "jolly",
    "keen",
    "lucid",
    "modest",
    "nifty",
    "optimistic",
    "patient",
    "quirky",
    "relaxed",
    "serene",
    "sharp",
    "tender",
    "upbeat",
    "vigilant",
    "zealous",
];

const SURNAMES: &[&str] = &[
    "agnesi",
    "babbage",
    "banach",
    "bohr",
    "curie",
    "darwin",
    "euclid",
    "euler",
    "fermat",
    "franklin",
    "galileo",
    "gauss",
    "hamilton",
    "hopper",
    "hypatia",
    "kepler",
    "lamarr",
    "leakey",
    "lovelace",
    "mcclintock",
    "meitner",
    "mendel",
    "mirzakhani",
    "newton",
    "noether",
    "pasteur",
    "ramanujan",
    "ride",
    "shannon",
    "turing",
    "wiles",
    "wright",
];

/// Returns a random `adjective_surname` name.
#[must_use]
pub fn random_name() -> String {
    let entropy = uuid::Uuid::new_v4().into_bytes();
    let adjective = ADJECTIVES[usize::from(entropy[0]) % ADJECTIVES.len()];
    let surname = SURNAMES[usize::from(entropy[1]) % SURNAMES.len()];
    format!("{adjective}_{surname}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_has_two_parts_from_the_word_lists() {
        let name = random_name();
        let (adjective, surname) = name.split_once('_').expect("name should contain '_'");
        assert!(ADJECTIVES.contains(&adjective), "unknown adjective {adjective}");
        assert!(SURNAMES.contains(&surname), "unknown surname {surname}");
    }

    #[test]
    fn names_eventually_differ() {
        let first = random_name();
        let mut saw_different = false;
        for _ in 0..64 {
            if random_name() != first {
                saw_different = true;
                break;
            }
        }
        assert!(saw_different, "64 draws should not all collide");
    }
}
