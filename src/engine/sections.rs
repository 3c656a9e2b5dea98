use serde::Serialize;

use super::results::{Distribution, Histogram, LinearFit, PairedSeries, PolicyComparison, PolicyTrend, Trend};
use super::Engine;
use crate::data::schema::{
    DIGITAL_SCORE, INFRASTRUCTURE_FIELDS, MATH_SCORE, REGION, TOTAL_STUDENTS, USAGE_FIELDS, YEAR,
};

// ---------------------------------------------------------------------------
// Dashboard sections
// ---------------------------------------------------------------------------

/// Headline numbers and regional breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub school_count: usize,
    pub total_students: f64,
    pub average_digital_score: f64,
    pub average_math_score: f64,
    pub region_digital: Distribution,
    pub region_math: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitalResources {
    pub infrastructure: Distribution,
    pub usage: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub distribution: Histogram,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub series: PairedSeries,
    pub coefficient: f64,
    pub fit: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    pub by_year: PolicyTrend,
    pub by_region: PolicyComparison,
}

/// Everything the dashboard renders for one filtered record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub overview: Overview,
    pub digital_resources: DigitalResources,
    pub achievement: Achievement,
    pub correlation: Correlation,
    pub policy: Policy,
}

impl DashboardReport {
    /// Compute every section.
    ///
    /// `year_axis` fixes the keys of the achievement trend (typically every
    /// year of the unfiltered dataset) so filtered-out years show up as `NaN`
    /// instead of disappearing. `None` uses the years present in `engine`.
    pub fn build(engine: &Engine<'_>, histogram_bins: usize, year_axis: Option<&[String]>) -> Self {
        let trend = match year_axis {
            Some(years) => engine.trend_over(years, YEAR, MATH_SCORE),
            None => engine.trend(YEAR, MATH_SCORE),
        };

        DashboardReport {
            overview: Overview {
                school_count: engine.count(),
                total_students: engine.sum_field(TOTAL_STUDENTS),
                average_digital_score: engine.average_field(DIGITAL_SCORE),
                average_math_score: engine.average_field(MATH_SCORE),
                region_digital: engine.group_sum(REGION, DIGITAL_SCORE),
                region_math: engine.group_sum(REGION, MATH_SCORE),
            },
            digital_resources: DigitalResources {
                infrastructure: engine.field_totals(&INFRASTRUCTURE_FIELDS),
                usage: engine.field_averages(&USAGE_FIELDS),
            },
            achievement: Achievement {
                distribution: engine.histogram_bins(MATH_SCORE, histogram_bins),
                trend,
            },
            correlation: Correlation {
                series: engine.correlation_series(DIGITAL_SCORE, MATH_SCORE),
                coefficient: engine.pearson(DIGITAL_SCORE, MATH_SCORE),
                fit: engine.linear_fit(DIGITAL_SCORE, MATH_SCORE),
            },
            policy: Policy {
                by_year: engine.policy_trend(YEAR, MATH_SCORE),
                by_region: engine.policy_comparison(REGION, MATH_SCORE),
            },
        }
    }
}
