//! Backup passphrase generation

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use tether_domain::passphrase::PASSPHRASE_WORDS;

const WORDS: &[&str] = &[
    "acorn", "almond", "amber", "anchor", "apple", "apron", "arrow", "aspen", "atlas", "attic",
    "autumn", "badge", "bagel", "bamboo", "banjo", "barley", "basil", "beacon", "berry", "birch",
    "biscuit", "blanket", "blossom", "bonnet", "branch", "breeze", "brick", "bridge", "bronze",
    "bubble", "bucket", "butter", "cabin", "cactus", "candle", "canoe", "canyon", "carpet",
    "castle", "cedar", "cello", "chalk", "cherry", "chimney", "cider", "cinder", "citrus",
    "clover", "cobalt", "comet", "copper", "coral", "cotton", "cradle", "crayon", "cricket",
    "crystal", "cypress", "daisy", "dawn", "delta", "denim", "desert", "dolphin", "dragon",
    "drift", "eagle", "easel", "echo", "ember", "emerald", "falcon", "feather", "fennel", "fern",
    "fiddle", "flannel", "forest", "fossil", "fountain", "garden", "garnet", "ginger", "glacier",
    "granite", "gravel", "harbor", "harvest", "hazel", "heron", "hickory", "honey", "horizon",
    "indigo", "island", "ivory", "jasmine", "juniper", "kettle", "kiwi", "lagoon", "lantern",
    "lattice", "lemon", "lilac", "linen", "lotus", "maple", "marble", "meadow", "melon", "mesa",
    "mint", "mitten", "monsoon", "mosaic", "moss", "nectar", "nutmeg", "oasis", "olive", "onyx",
    "orchard", "otter", "paddle", "pebble", "pepper", "piano", "pine", "planet", "plum", "pollen",
    "poppy", "prairie", "pumpkin", "quartz", "quill", "rabbit", "radish", "raven", "reef",
    "ribbon", "river", "robin", "rocket", "saddle", "saffron", "sage", "sail", "sandal", "satin",
    "scarf", "shell", "sierra", "silver", "sparrow", "spruce", "summit", "sunset", "swallow",
    "tango", "thistle", "thunder", "timber", "topaz", "tulip", "tundra", "turtle", "umber",
    "valley", "velvet", "violet", "walnut", "willow", "window", "winter", "wren", "yarrow",
    "zephyr",
];

/// Generate a random six-word passphrase
///
/// The result always satisfies
/// [`validate_passphrase`](tether_domain::passphrase::validate_passphrase).
pub fn generate_passphrase() -> String {
    let mut rng = OsRng;
    (0..PASSPHRASE_WORDS)
        .filter_map(|_| WORDS.choose(&mut rng).copied())
        .collect::<Vec<_>>()
        .join(" ")
}
