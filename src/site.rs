//! Page navigation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Top,
    Musics,
    Blog,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Top, Page::Musics, Page::Blog];

    pub fn id(self) -> &'static str {
        match self {
            Page::Top => "top",
            Page::Musics => "musics",
            Page::Blog => "blog",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Page::Top => 0,
            Page::Musics => 1,
            Page::Blog => 2,
        }
    }

    pub fn next(self) -> Page {
        Page::ALL[(self.index() + 1) % Page::ALL.len()]
    }

    pub fn previous(self) -> Page {
        Page::ALL[(self.index() + Page::ALL.len() - 1) % Page::ALL.len()]
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown page '{s}'"))
    }
}

/// Side effect a page switch asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageAction {
    LoadBlog,
}

/// Which page is active.
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    active: Page,
}

impl Navigator {
    pub fn new(initial: Page) -> Self {
        Self { active: initial }
    }

    pub fn active(&self) -> Page {
        self.active
    }

    /// Action owed for the page shown at startup.
    pub fn initial_action(&self) -> Option<PageAction> {
        Self::action_for(self.active)
    }

    /// Show `page`. Activating the blog always reloads it.
    pub fn activate(&mut self, page: Page) -> Option<PageAction> {
        self.active = page;
        Self::action_for(page)
    }

    fn action_for(page: Page) -> Option<PageAction> {
        (page == Page::Blog).then_some(PageAction::LoadBlog)
    }
}
