use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

use crate::db::models::{Dataset, Fixture, TeamRecord};

/// NRR as a number; unparseable values count as zero.
pub fn nrr_value(nrr: &str) -> f64 {
    nrr.trim().parse::<f64>().unwrap_or(0.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsEntry {
    pub position: usize,
    pub team: String,
    #[serde(flatten)]
    pub record: TeamRecord,
}

/// Teams ordered by points, then NRR, both descending.
pub fn standings(dataset: &Dataset) -> Vec<StandingsEntry> {
    let mut teams: Vec<(&String, &TeamRecord)> = dataset.teams.iter().collect();
    teams.sort_by(|(_, a), (_, b)| {
        b.points.cmp(&a.points).then_with(|| {
            nrr_value(&b.nrr)
                .partial_cmp(&nrr_value(&a.nrr))
                .unwrap_or(Ordering::Equal)
        })
    });
    teams
        .into_iter()
        .enumerate()
        .map(|(i, (name, record))| StandingsEntry {
            position: i + 1,
            team: name.clone(),
            record: record.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingFixture {
    pub id: String,
    #[serde(flatten)]
    pub fixture: Fixture,
}

/// Fixtures on or after `today`, soonest first. Fixtures without a known date
/// never appear. When nothing is left to play, every dated fixture is listed.
pub fn upcoming_fixtures(dataset: &Dataset, today: NaiveDate) -> Vec<UpcomingFixture> {
    let mut dated: Vec<(NaiveDate, &String, &Fixture)> = dataset
        .fixtures
        .iter()
        .filter_map(|(id, f)| {
            let date = NaiveDate::parse_from_str(&f.date, "%Y-%m-%d").ok()?;
            Some((date, id, f))
        })
        .collect();
    dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let ahead: Vec<_> = dated.iter().filter(|(d, _, _)| *d >= today).collect();
    let chosen: Vec<_> = if ahead.is_empty() {
        dated.iter().collect()
    } else {
        ahead
    };
    chosen
        .into_iter()
        .map(|(_, id, f)| UpcomingFixture {
            id: (*id).clone(),
            fixture: (*f).clone(),
        })
        .collect()
}
