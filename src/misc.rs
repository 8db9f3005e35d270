use hashbrown::HashMap;

/// Fuzzy string matching, used to pick audio devices by a partial name.
pub trait Similarity {
    fn similarity(&self, other: &Self) -> f64;
}

impl<T: AsRef<str> + ?Sized> Similarity for T {
    fn similarity(&self, other: &Self) -> f64 {
        similarity(self.as_ref(), other.as_ref())
    }
}

/// Dice coefficient of the character bigrams of both strings, ignoring spaces.
/// 1.0 means identical, 0.0 means no bigram in common.
pub fn similarity(str1: &str, str2: &str) -> f64 {
    let a = str1.chars().filter(|x| *x != ' ').collect::<Vec<_>>();
    let b = str2.chars().filter(|x| *x != ' ').collect::<Vec<_>>();

    // Check some simple cases
    if a == b {
        return 1.0;
    }

    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut first_bigrams = HashMap::<(char, char), i32>::new();
    for i in a.windows(2) {
        *first_bigrams.entry((i[0], i[1])).or_insert(0) += 1;
    }

    let mut intersection_size = 0;
    for i in b.windows(2) {
        if let Some(count) = first_bigrams.get_mut(&(i[0], i[1])).filter(|x| **x > 0) {
            *count -= 1;
            intersection_size += 1;
        }
    }

    (2.0 * intersection_size as f64) / (a.len() + b.len() - 2) as f64
}

#[cfg(test)]
mod test {
    use super::{similarity, Similarity};

    #[test]
    fn test_similarity_identical() {
        assert_eq!(similarity("pulse audio", "pulseaudio"), 1.0);
    }

    #[test]
    fn test_similarity_disjoint() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("a", "ab"), 0.0);
    }

    #[test]
    fn test_similarity_partial() {
        // night / nacht share only "ht": 2 * 1 / (4 + 4)
        assert_eq!(similarity("night", "nacht"), 0.25);
    }

    #[test]
    fn test_similarity_picks_closest() {
        let wanted = "usb";
        let names = ["hdmi output", "usb audio codec", "built-in speakers"];
        let best = names
            .iter()
            .map(|x| (x.similarity(&wanted), *x))
            .reduce(|a, b| if a.0 >= b.0 { a } else { b })
            .unwrap();
        assert_eq!(best.1, "usb audio codec");
    }

    #[test]
    fn test_similarity_unicode() {
        assert!(similarity("lautsprecher ü", "lautsprecher") > 0.8);
    }
}
