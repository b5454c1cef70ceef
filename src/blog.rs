//! Blog document loading: `---`-separated markdown blocks.

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::io::ImageRef;

/// One displayed block of the blog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlogBlock {
    pub markdown: String,
    pub background: Option<ImageRef>,
}

impl BlogBlock {
    /// First heading of the block, without its `#` markers.
    pub fn title(&self) -> Option<&str> {
        self.markdown
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with('#'))
            .map(|line| line.trim_start_matches('#').trim())
    }
}

/// What the blog page shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlogView {
    Blocks(Vec<BlogBlock>),
    /// Shown inline in place of the content.
    Error(String),
}

/// Split on lines that are exactly `---`, dropping blank blocks.
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line == "---" {
            blocks.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }
    blocks.push(current.join("\n"));

    blocks
        .into_iter()
        .filter(|block| !block.trim().is_empty())
        .map(|block| block.trim().to_string())
        .collect()
}

/// Turn a document into blocks, each with a random background.
pub fn render_blocks<R: Rng + ?Sized>(
    text: &str,
    backgrounds: &[ImageRef],
    rng: &mut R,
) -> Vec<BlogBlock> {
    split_blocks(text)
        .into_iter()
        .map(|markdown| BlogBlock {
            markdown,
            background: backgrounds.choose(rng).cloned(),
        })
        .collect()
}

/// Reads the blog document from disk on every load, so edits show up
/// without a restart.
#[derive(Clone, Debug)]
pub struct BlogLoader {
    path: PathBuf,
    backgrounds: Vec<ImageRef>,
}

impl BlogLoader {
    pub fn new(path: impl Into<PathBuf>, backgrounds: Vec<ImageRef>) -> Self {
        Self {
            path: path.into(),
            backgrounds,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load<R: Rng + ?Sized>(&self, rng: &mut R) -> BlogView {
        match fs::read_to_string(&self.path) {
            Ok(text) => BlogView::Blocks(render_blocks(&text, &self.backgrounds, rng)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "blog load failed");
                BlogView::Error(format!("could not load {}: {}", self.path.display(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn splits_on_exact_separator_lines() {
        let text = "# One\nhello\n---\n# Two\n----\nstill two\n---\n";

        let blocks = split_blocks(text);

        assert_eq!(blocks, vec!["# One\nhello", "# Two\n----\nstill two"]);
    }

    #[test]
    fn blank_blocks_are_skipped() {
        let text = "---\n\n   \n---\nbody\n---\n---";
        assert_eq!(split_blocks(text), vec!["body"]);
    }

    #[test]
    fn crlf_separators_split() {
        assert_eq!(split_blocks("a\r\n---\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn separator_with_spaces_is_content() {
        assert_eq!(split_blocks("a\n --- \nb"), vec!["a\n --- \nb"]);
    }

    #[test]
    fn backgrounds_come_from_catalog() {
        let images = vec![ImageRef::from("bg1.png"), ImageRef::from("bg2.png")];
        let mut rng = StdRng::seed_from_u64(3);

        let blocks = render_blocks("a\n---\nb\n---\nc", &images, &mut rng);

        assert_eq!(blocks.len(), 3);
        assert!(blocks
            .iter()
            .all(|b| images.contains(b.background.as_ref().unwrap())));
    }

    #[test]
    fn no_images_means_no_background() {
        let mut rng = StdRng::seed_from_u64(3);
        let blocks = render_blocks("a", &[], &mut rng);
        assert_eq!(blocks[0].background, None);
    }

    #[test]
    fn title_is_first_heading() {
        let block = BlogBlock {
            markdown: "intro\n## Hello world\ntext".into(),
            background: None,
        };
        assert_eq!(block.title(), Some("Hello world"));
    }

    #[test]
    fn loader_reads_file_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.md");
        fs::write(&path, "first\n---\nsecond\n").unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let view = BlogLoader::new(&path, Vec::new()).load(&mut rng);
        assert!(matches!(view, BlogView::Blocks(ref blocks) if blocks.len() == 2));

        let missing = BlogLoader::new(dir.path().join("gone.md"), Vec::new()).load(&mut rng);
        assert!(matches!(missing, BlogView::Error(_)));
    }
}
