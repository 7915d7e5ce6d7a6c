use rolecase::error::ExtractionError;
use rolecase::extract::{scrape_html, MAX_DESCRIPTION_CHARS, MIN_DESCRIPTION_CHARS};
use serde_json::{json, Value};

/// `count` distinct sentences joined by single spaces.
fn prose(count: usize) -> String {
    (1..=count)
        .map(|i| format!("Point {} of the role covers delivery and ownership.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ld_script(posting: &Value) -> String {
    format!(r#"<script type="application/ld+json">{}</script>"#, posting)
}

#[test]
fn indeed_reads_the_view_pane() {
    let description = prose(6);
    let html = format!(
        r#"<html><head><meta name="robots" content="noindex"></head><body>
        <div id="jobDescriptionText">Outside the pane, from a different listing entirely, never picked.</div>
        <div id="jobsearch-ViewjobPaneWrapper">
          <h1>Backend Developer</h1>
          <div data-company-name="true">Globex</div>
          <div class="companyLocation">Manchester</div>
          <div id="jobDescriptionText"><p>{}</p></div>
        </div></body></html>"#,
        description
    );

    let data = scrape_html("https://uk.indeed.com/viewjob?jk=abc", &html).unwrap();
    assert_eq!(data.title, "Backend Developer");
    assert_eq!(data.company, "Globex");
    assert_eq!(data.location, "Manchester");
    assert_eq!(data.description, description);
    assert_eq!(data.displayed_description, None);
    assert_eq!(data.salary, None);
    assert_eq!(data.url, "https://uk.indeed.com/viewjob?jk=abc");
    assert!(data.date_extracted.is_some());
}

#[test]
fn linkedin_takes_the_longer_description() {
    let posting = json!({
        "@context": "https://schema.org",
        "@type": "JobPosting",
        "title": "Product Designer",
        "hiringOrganization": {"@type": "Organization", "name": "Initech", "sameAs": "https://initech.test"},
        "description": "Design things for our customers, short version."
    });
    let longer = prose(5);
    let html = format!(
        r#"<html><head>{}</head><body>
        <h1 class="top-card-layout__title">Ignored DOM title</h1>
        <div class="description__text"><p>{}</p></div>
        </body></html>"#,
        ld_script(&posting),
        longer
    );

    let data = scrape_html("https://www.linkedin.com/jobs/view/42", &html).unwrap();
    assert_eq!(data.title, "Product Designer");
    assert_eq!(data.company, "Initech");
    assert_eq!(data.description, longer);
    assert_eq!(data.displayed_description, None);
}

#[test]
fn linkedin_keeps_structured_description_when_dom_is_shorter() {
    let body = prose(4);
    let posting = json!({
        "@type": "JobPosting",
        "title": "Product Designer",
        "description": format!("<p>{}</p>", body)
    });
    let html = format!(
        r#"<html><head>{}</head><body>
        <div class="description__text"><p>Short DOM blurb.</p></div>
        </body></html>"#,
        ld_script(&posting)
    );

    let data = scrape_html("https://www.linkedin.com/jobs/view/43", &html).unwrap();
    assert_eq!(data.description, body);
    assert_eq!(data.displayed_description, Some(format!("<p>{}</p>", body)));
}

#[test]
fn structured_data_alone_fills_every_field() {
    let body = prose(3);
    let posting = json!({
        "@type": "JobPosting",
        "title": "Head Chef",
        "hiringOrganization": {"@type": "Organization", "name": "The Ivy", "logo": "https://ivy.test/logo.png"},
        "jobLocation": {
            "@type": "Place",
            "address": {"@type": "PostalAddress", "addressLocality": "London", "addressCountry": "GB"}
        },
        "baseSalary": {
            "@type": "MonetaryAmount",
            "currency": "GBP",
            "value": {"@type": "QuantitativeValue", "minValue": 30000, "maxValue": 35000, "unitText": "YEAR"}
        },
        "datePosted": "2024-05-01T09:00:00Z",
        "validThrough": "2024-06-30",
        "description": body
    });
    let html = format!(
        r#"<html><head>{}</head><body><h1>Head Chef</h1><p>Apply now.</p></body></html>"#,
        ld_script(&json!({"@graph": [{"@type": "WebPage"}, posting]}))
    );

    let data = scrape_html("https://careers.theivy.test/jobs/9", &html).unwrap();
    assert_eq!(data.title, "Head Chef");
    assert_eq!(data.company, "The Ivy");
    assert_eq!(data.location, "London GB");
    assert_eq!(data.salary.as_deref(), Some("£30000 - £35000 YEAR"));
    assert_eq!(data.date_posted.as_deref(), Some("2024-05-01"));
    assert_eq!(data.date_closing.as_deref(), Some("2024-06-30"));
    assert_eq!(data.description, body);
    assert_eq!(data.displayed_description, None);
}

#[test]
fn page_metadata_backs_up_missing_title_and_company() {
    let body = prose(20);
    let html = format!(
        r#"<html><head>
        <title>Careers | Umbrella</title>
        <meta property="og:site_name" content="Umbrella Corp">
        </head><body><article><p>{}</p></article></body></html>"#,
        body
    );

    let data = scrape_html("https://umbrella.test/careers/7", &html).unwrap();
    assert_eq!(data.title, "Careers | Umbrella");
    assert_eq!(data.company, "Umbrella Corp");
    assert_eq!(data.description, body);
}

#[test]
fn generic_pages_prefer_substantial_dom_text() {
    let body = prose(20);
    assert!(body.chars().count() > 500);
    let posting = json!({
        "@type": ["JobPosting"],
        "title": "Analyst",
        "description": "Analyse.Things.Without.Any.Spaces.Because.The.Markup.Was.Stripped."
    });
    let html = format!(
        r#"<html><head>{}</head><body><nav>Home</nav><article><p>{}</p></article></body></html>"#,
        ld_script(&posting),
        body
    );

    let data = scrape_html("https://jobs.acme.test/analyst", &html).unwrap();
    assert_eq!(data.title, "Analyst");
    assert_eq!(data.description, body);
}

#[test]
fn generic_pages_trim_trailing_listings() {
    let body = prose(20);
    let html = format!(
        r#"<html><body><article><p>{}</p>
        <h3>Related jobs</h3><p>Sous Chef at Elsewhere</p></article></body></html>"#,
        body
    );

    let data = scrape_html("https://jobs.acme.test/chef", &html).unwrap();
    assert_eq!(data.description, body);
}

#[test]
fn site_families_other_than_generic_keep_noise() {
    let body = prose(4);
    let html = format!(
        r#"<html><body><div class="description__text"><p>{}</p><p>Similar jobs</p></div></body></html>"#,
        body
    );

    let data = scrape_html("https://www.linkedin.com/jobs/view/44", &html).unwrap();
    assert!(data.description.ends_with("Similar jobs"));
}

#[test]
fn descriptions_are_capped() {
    let html = format!(
        "<html><body><article><p>{}</p></article></body></html>",
        prose(700)
    );

    let data = scrape_html("https://jobs.acme.test/long", &html).unwrap();
    assert_eq!(data.description.chars().count(), MAX_DESCRIPTION_CHARS);
}

#[test]
fn pages_without_a_description_are_rejected() {
    let err = scrape_html(
        "https://jobs.acme.test/empty",
        "<html><body><p>Too short</p></body></html>",
    )
    .unwrap_err();
    assert_eq!(
        err,
        ExtractionError::MissingDescription { found: 0, required: MIN_DESCRIPTION_CHARS }
    );

    let err = scrape_html("not a url", "<html></html>").unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidUrl(_)));
}
