/// One entry of the postbox list as scraped from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub segments: Vec<String>,
    pub href: Option<String>,
}

/// A single document to fetch. `filename` of `None` means the server decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Aborting,
}
