/// Phone numbers allowed to submit, approve and receive notifications.
///
/// Order matters: the first entry is the operator's own number and receives
/// administrative notifications.
#[derive(Debug, Clone, Default)]
pub struct TrustList {
    numbers: Vec<String>,
}

impl TrustList {
    pub fn new<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            numbers: numbers.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, dropping blank entries.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty()),
        )
    }

    pub fn contains(&self, number: &str) -> bool {
        self.numbers.iter().any(|n| n == number)
    }

    pub fn owner(&self) -> Option<&str> {
        self.numbers.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}
