//! Plain-text match digests for the batch notifier. Delivery happens elsewhere.

use serde::{Deserialize, Serialize};

use crate::matching::index::MatchIndex;
use crate::matching::ranker::{MatchFilters, RankedPosting};

pub const DIGEST_SUBJECT: &str = "Your Daily Job Matches";
pub const DEFAULT_DIGEST_SIZE: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub skills: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub email: String,
    pub subject: String,
    pub body: String,
    pub match_count: usize,
}

/// Ranks a subscriber's skills against the whole corpus and renders the top `top_n`.
pub fn compose_digest(index: &MatchIndex, subscriber: &Subscriber, top_n: usize) -> Digest {
    let matches = index.rank(&subscriber.skills, &MatchFilters::default(), top_n);
    Digest {
        email: subscriber.email.clone(),
        subject: DIGEST_SUBJECT.to_string(),
        body: render_body(&matches, top_n),
        match_count: matches.len(),
    }
}

fn render_body(matches: &[RankedPosting<'_>], top_n: usize) -> String {
    if matches.is_empty() {
        return "No new matching jobs found today. Please check back later!".to_string();
    }

    let mut body = format!("Hi,\n\nHere are your top {top_n} job matches for today:\n\n");
    for m in matches {
        let p = m.posting;
        body.push_str(&format!(
            "{} at {} ({})\n",
            p.title,
            p.company.as_deref().unwrap_or("N/A"),
            p.location.as_deref().unwrap_or("N/A")
        ));
        if p.has_direct_link() {
            body.push_str(&format!("Link: {}\n", p.job_link.as_deref().unwrap_or_default()));
        }
        body.push_str(&format!("Skills: {}\n", p.skills));
        body.push_str(&format!("Cluster: {}\n", p.cluster_id));
        body.push_str(&format!("Similarity: {:.2}\n\n", m.similarity_score));
    }
    body.push_str("Best,\nJob Matcher");
    body
}
