use select::predicate::{Attr, Class, Name, Predicate};

use super::rules::{Rules, Scoped, Select};

/// Minimum DOM description length the generic family trusts over structured data.
pub const GENERIC_MIN_DOM_CHARS: usize = 500;

/// Footer phrases that mark the start of unrelated listings on generic pages.
pub const NOISE_PHRASES: &[&str] = &[
    "Related jobs",
    "Similar jobs",
    "People also viewed",
    "You might also like",
];

/// Site families with their own selector lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteFamily {
    Indeed,
    LinkedIn,
    Generic,
}

/// How the DOM description competes with the structured-data one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionPolicy {
    /// Take the DOM text only when it is strictly longer.
    PreferLonger,
    /// Take the DOM text whenever it is longer than the given number of
    /// characters; structured descriptions on generic pages often lose
    /// their whitespace.
    PreferSubstantial(usize),
}

/// Ordered candidate rules per field.
pub struct FamilyRules {
    pub description: Rules,
    pub title: Rules,
    pub company: Rules,
    pub location: Rules,
}

impl SiteFamily {
    /// Classify a page by host name alone.
    pub fn detect(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if host.contains("indeed") {
            SiteFamily::Indeed
        } else if host.contains("linkedin") {
            SiteFamily::LinkedIn
        } else {
            SiteFamily::Generic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SiteFamily::Indeed => "indeed",
            SiteFamily::LinkedIn => "linkedin",
            SiteFamily::Generic => "generic",
        }
    }

    pub fn description_policy(&self) -> DescriptionPolicy {
        match self {
            SiteFamily::Indeed | SiteFamily::LinkedIn => DescriptionPolicy::PreferLonger,
            SiteFamily::Generic => DescriptionPolicy::PreferSubstantial(GENERIC_MIN_DOM_CHARS),
        }
    }

    /// Boilerplate phrases trimmed from the chosen description.
    pub fn noise_phrases(&self) -> &'static [&'static str] {
        match self {
            SiteFamily::Generic => NOISE_PHRASES,
            _ => &[],
        }
    }

    pub fn rules(&self) -> FamilyRules {
        match self {
            SiteFamily::Indeed => indeed_rules(),
            SiteFamily::LinkedIn => linkedin_rules(),
            SiteFamily::Generic => generic_rules(),
        }
    }
}

const INDEED_PANE: Attr<&str, &str> = Attr("id", "jobsearch-ViewjobPaneWrapper");

fn indeed_rules() -> FamilyRules {
    FamilyRules {
        description: vec![
            Box::new(Scoped { scope: INDEED_PANE, target: Attr("id", "jobDescriptionText") }),
            Box::new(Scoped { scope: INDEED_PANE, target: Class("jobsearch-jobDescriptionText") }),
        ],
        title: vec![
            Box::new(Scoped { scope: INDEED_PANE, target: Name("h1") }),
            Box::new(Scoped { scope: INDEED_PANE, target: Class("jobsearch-JobInfoHeader-title") }),
        ],
        company: vec![Box::new(Scoped {
            scope: INDEED_PANE,
            target: Name("div").and(Attr("data-company-name", ())),
        })],
        location: vec![Box::new(Scoped { scope: INDEED_PANE, target: Class("companyLocation") })],
    }
}

fn linkedin_rules() -> FamilyRules {
    FamilyRules {
        description: vec![
            Box::new(Select(Class("description__text"))),
            Box::new(Select(Class("jobs-description__content"))),
            Box::new(Select(Attr("id", "job-details"))),
        ],
        title: vec![
            Box::new(Select(Name("h1").and(Class("top-card-layout__title")))),
            Box::new(Select(Name("h1"))),
        ],
        company: vec![Box::new(Select(Name("a").and(Class("topcard__org-name-link"))))],
        location: vec![Box::new(Select(Name("span").and(Class("topcard__flavor--bullet"))))],
    }
}

fn generic_rules() -> FamilyRules {
    FamilyRules {
        description: vec![
            Box::new(Select(Name("article"))),
            Box::new(Select(Name("main"))),
            Box::new(Select(Class("job-description"))),
            Box::new(Select(Class("description"))),
            Box::new(Select(Name("body"))),
        ],
        title: vec![Box::new(Select(Name("h1")))],
        company: vec![Box::new(Select(Class("company"))), Box::new(Select(Class("org")))],
        location: vec![Box::new(Select(Class("location")))],
    }
}
