//! Packaged English reference tables.
//!
//! Frequencies are fractions of their population (letters, bigram positions,
//! trigram positions).  The bigram/trigram lists are the most common entries
//! of large mixed-register corpora; coverage beyond the top ~50 adds noise
//! faster than signal for short buffers.

/// Relative frequencies of `a`..`z` in English text.  Sums to 1.0.
pub const LETTER_FREQ: [f64; 26] = [
    0.08167, // a
    0.01492, // b
    0.02782, // c
    0.04253, // d
    0.12702, // e
    0.02228, // f
    0.02015, // g
    0.06094, // h
    0.06966, // i
    0.00153, // j
    0.00772, // k
    0.04025, // l
    0.02406, // m
    0.06749, // n
    0.07507, // o
    0.01929, // p
    0.00095, // q
    0.05987, // r
    0.06327, // s
    0.09056, // t
    0.02758, // u
    0.00978, // v
    0.02360, // w
    0.00150, // x
    0.01974, // y
    0.00074, // z
];

/// Most common English bigrams with their fraction of all bigram positions.
pub const BIGRAMS: &[(&str, f64)] = &[
    ("th", 0.0356), ("he", 0.0307), ("in", 0.0243), ("er", 0.0205),
    ("an", 0.0199), ("re", 0.0185), ("on", 0.0176), ("at", 0.0149),
    ("en", 0.0145), ("nd", 0.0135), ("ti", 0.0134), ("es", 0.0134),
    ("or", 0.0128), ("te", 0.0120), ("of", 0.0117), ("ed", 0.0117),
    ("is", 0.0113), ("it", 0.0112), ("al", 0.0109), ("ar", 0.0107),
    ("st", 0.0105), ("to", 0.0105), ("nt", 0.0104), ("ng", 0.0095),
    ("se", 0.0093), ("ha", 0.0093), ("as", 0.0087), ("ou", 0.0087),
    ("io", 0.0083), ("le", 0.0083), ("ve", 0.0083), ("co", 0.0079),
    ("me", 0.0079), ("de", 0.0076), ("hi", 0.0076), ("ri", 0.0073),
    ("ro", 0.0073), ("ic", 0.0070), ("ne", 0.0069), ("ea", 0.0069),
    ("ra", 0.0069), ("ce", 0.0065), ("li", 0.0062), ("ch", 0.0060),
    ("ll", 0.0058), ("be", 0.0058), ("ma", 0.0057), ("si", 0.0055),
    ("om", 0.0055), ("ur", 0.0054),
];

/// Most common English trigrams with their fraction of all trigram positions.
pub const TRIGRAMS: &[(&str, f64)] = &[
    ("the", 0.0181), ("and", 0.0073), ("ing", 0.0072), ("ent", 0.0042),
    ("ion", 0.0042), ("her", 0.0036), ("for", 0.0034), ("tha", 0.0033),
    ("nth", 0.0033), ("int", 0.0032), ("ere", 0.0031), ("tio", 0.0031),
    ("ter", 0.0030), ("est", 0.0028), ("ers", 0.0028), ("ati", 0.0026),
    ("hat", 0.0026), ("ate", 0.0025), ("all", 0.0025), ("eth", 0.0024),
    ("hes", 0.0024), ("ver", 0.0024), ("his", 0.0024), ("oft", 0.0022),
    ("ith", 0.0021), ("fth", 0.0021), ("sth", 0.0021), ("oth", 0.0021),
    ("res", 0.0021), ("ont", 0.0020), ("are", 0.0020), ("ear", 0.0020),
    ("wit", 0.0020), ("eve", 0.0019), ("ess", 0.0019), ("not", 0.0018),
    ("was", 0.0018), ("ect", 0.0018), ("rea", 0.0018), ("com", 0.0017),
    ("per", 0.0017), ("sta", 0.0017), ("cti", 0.0016), ("ica", 0.0016),
    ("ist", 0.0016), ("ain", 0.0016), ("one", 0.0015), ("our", 0.0015),
    ("iti", 0.0015), ("rat", 0.0015),
];

/// Short common-word list, most frequent first.
pub const COMMON_WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "it",
    "for", "not", "on", "with", "he", "as", "you", "do", "at", "this",
    "but", "his", "by", "from", "they", "we", "say", "her", "she", "or",
    "an", "will", "my", "one", "all", "would", "there", "their", "what",
    "so", "up", "out", "if", "about", "who", "get", "which", "go", "me",
    "when",
];
