//! Word pools for dealing boards and inventing clues.

use std::path::{Path, PathBuf};

use codenames_engine::board::{normalize_word, BOARD_SIZE};
use thiserror::Error;

/// Built-in board vocabulary.
pub const DEFAULT_WORDS: &[&str] = &[
    "africa", "agent", "air", "alien", "alps", "amazon", "ambulance", "america", "angel",
    "antarctica", "apple", "arm", "atlantis", "australia", "aztec", "back", "ball", "band",
    "bank", "bar", "bark", "bat", "battery", "beach", "bear", "beat", "bed", "beijing", "bell",
    "belt", "berlin", "bermuda", "berry", "bill", "block", "board", "bolt", "bomb", "bond",
    "boom", "boot", "bottle", "bow", "box", "bridge", "brush", "buck", "buffalo", "bug",
    "bugle", "button", "calf", "canada", "cap", "capital", "car", "card", "carrot", "casino",
    "cast", "cat", "cell", "centaur", "center", "chair", "change", "charge", "check", "chest",
    "chick", "china", "chocolate", "church", "circle", "cliff", "cloak", "club", "code",
    "cold", "comic", "compound", "concert", "conductor", "contract", "cook", "copper",
    "cotton", "court", "cover", "crane", "crash", "cricket", "cross", "crown", "cycle",
    "czech", "dance", "date", "day", "death", "deck", "degree", "diamond", "dice",
    "dinosaur", "disease", "doctor", "dog", "draft", "dragon", "dress", "drill", "drop",
    "duck", "dwarf", "eagle", "egypt", "embassy", "engine", "england", "europe", "eye",
    "face", "fair", "fall", "fan", "fence", "field", "fighter", "figure", "file", "film",
    "fire", "fish", "flute", "fly", "foot", "force", "forest", "fork", "france", "game",
    "gas", "genius", "germany", "ghost", "giant", "glass", "glove", "gold", "grace",
    "grass", "greece", "green", "ground", "ham", "hand", "hawk", "head", "heart",
    "helicopter", "himalayas", "hole", "hollywood", "honey", "hood", "hook", "horn",
    "horse", "hospital", "hotel", "ice", "india", "iron", "ivory", "jack", "jam", "jet",
    "jupiter", "kangaroo", "ketchup", "key", "kid", "king", "kiwi", "knife", "knight",
    "lab", "lap", "laser", "lawyer", "lead", "lemon", "leprechaun", "life", "light",
    "limousine", "line", "link", "lion", "litter", "lock", "log", "london", "luck", "mail",
    "mammoth", "maple", "marble", "march", "mass", "match", "mercury", "mexico",
    "microscope", "millionaire", "mine", "mint", "missile", "model", "mole", "moon",
    "moscow", "mount", "mouse", "mouth", "mug", "nail", "needle", "net", "night", "ninja",
    "note", "novel", "nurse", "nut", "octopus", "oil", "olive", "olympus", "opera",
    "orange", "organ", "palm", "pan", "pants", "paper", "parachute", "park", "part",
    "pass", "paste", "penguin", "phoenix", "piano", "pie", "pilot", "pin", "pipe",
    "pirate", "pistol", "pit", "pitch", "plane", "plastic", "plate", "platypus", "play",
    "plot", "point", "poison", "pole", "police", "pool", "port", "post", "pound", "press",
    "princess", "pumpkin", "pupil", "pyramid", "queen", "rabbit", "racket", "ray",
    "revolution", "ring", "robin", "robot", "rock", "rome", "root", "rose", "roulette",
    "round", "row", "ruler", "satellite", "saturn", "scale", "school", "scientist",
    "scorpion", "screen", "scuba", "seal", "server", "shadow", "shakespeare", "shark",
    "ship", "shoe", "shop", "shot", "sink", "skyscraper", "slip", "slug", "smuggler",
    "snow", "snowman", "sock", "soldier", "soul", "sound", "space", "spell", "spider",
    "spike", "spine", "spot", "spring", "spy", "square", "stadium", "staff", "star",
    "state", "stick", "stock", "straw", "stream", "strike", "string", "sub", "suit",
    "superhero", "swing", "switch", "table", "tablet", "tag", "tail", "tap", "teacher",
    "telescope", "temple", "theater", "thief", "thumb", "tick", "tie", "time", "tokyo",
    "tooth", "torch", "tower", "track", "train", "triangle", "trip", "trunk", "tube",
    "turkey", "undertaker", "unicorn", "vacuum", "van", "vet", "wake", "wall", "war",
    "washer", "washington", "watch", "water", "wave", "web", "well", "whale", "whip",
    "wind", "witch", "worm", "yard",
];

/// Words simulated spymasters draw clues from.
pub const CLUE_WORDS: &[&str] = &[
    "anatomy", "animal", "ancient", "battle", "bright", "city", "classic", "cosmic",
    "country", "craft", "danger", "deep", "dream", "element", "energy", "fast", "feast",
    "frozen", "garden", "heavy", "history", "hunter", "journey", "kingdom", "machine",
    "magic", "medicine", "metal", "music", "mystery", "ocean", "royal", "science", "secret",
    "sharp", "signal", "sport", "storm", "tool", "travel", "treasure", "wild",
];

/// Errors loading a word list.
#[derive(Debug, Error)]
pub enum WordsError {
    #[error("failed to read word list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("word list {} has {found} distinct words, need at least {needed}", path.display())]
    TooFew {
        path: PathBuf,
        found: usize,
        needed: usize,
    },
}

/// The built-in pool as owned strings.
pub fn default_word_pool() -> Vec<String> {
    DEFAULT_WORDS.iter().map(|w| w.to_string()).collect()
}

/// Parse a newline-delimited word list. Blank lines and `#` comments are
/// skipped; words are normalised and deduplicated.
pub fn parse_word_list(contents: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let word = normalize_word(line);
        if !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

/// Load a word list from disk, requiring enough words for one board.
pub fn load_word_pool(path: &Path) -> Result<Vec<String>, WordsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| WordsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let words = parse_word_list(&contents);
    if words.len() < BOARD_SIZE {
        return Err(WordsError::TooFew {
            path: path.to_path_buf(),
            found: words.len(),
            needed: BOARD_SIZE,
        });
    }
    Ok(words)
}
