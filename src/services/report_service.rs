use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::date_key::DateKey;
use crate::models::entry::{PeriodType, StatEntry};
use crate::models::report::{
    ChartAxis, CompositeChart, CompositeLine, OverlayChart, WeeklyCumulativeReport,
};
use crate::models::stat::StatDefinition;
use crate::models::week::{WeekWindow, DAYS_PER_WEEK};
use crate::services::cumulative_projector::{project, PreviousWeek};
use crate::services::entry_service::EntryService;
use crate::services::overlay_shifter::{overlay, shift};
use crate::services::quota_service::QuotaService;
use crate::services::settings_service::SettingsService;
use crate::services::slot_scheme::{generate_slots, slot_dates};
use crate::services::stat_service::StatService;
use crate::services::{composite_merger, week_boundary};

pub struct ReportService {
    settings: Arc<SettingsService>,
    stats: Arc<StatService>,
    entries: Arc<EntryService>,
    quotas: Arc<QuotaService>,
}

impl ReportService {
    pub fn new(
        settings: Arc<SettingsService>,
        stats: Arc<StatService>,
        entries: Arc<EntryService>,
        quotas: Arc<QuotaService>,
    ) -> Self {
        Self {
            settings,
            stats,
            entries,
            quotas,
        }
    }

    pub fn current_week(&self, now: DateTime<Utc>) -> AppResult<WeekWindow> {
        let week = self.settings.week_settings()?;
        Ok(week_boundary::current_week(now, &week))
    }

    /// Running totals for the week filed under `week_ending`. A date that is
    /// not the closing weekday is moved forward to the next one.
    pub fn weekly_cumulative_report(
        &self,
        stat_id: &str,
        week_ending: NaiveDate,
        show_previous_week: bool,
    ) -> AppResult<WeeklyCumulativeReport> {
        let definition = self.stats.get_definition(stat_id)?;
        ensure_plain(&definition)?;

        let settings = self.settings.get()?;
        let week = &settings.week;
        let week_ending = week_boundary::week_ending_on_or_after(
            week_ending.and_time(NaiveTime::MIN),
            week.week_end_day,
            None,
        );

        let slots = generate_slots(definition.category, week, settings.day_scheme_omitted_weekdays);
        let keys = slot_dates(week_ending, &slots, week);
        let values = self.daily_values(stat_id, &keys)?;

        let previous_keys: Vec<DateKey> = if show_previous_week {
            keys.iter()
                .map(|key| key.shifted_days(-(DAYS_PER_WEEK as i64)))
                .collect()
        } else {
            Vec::new()
        };
        let previous_values = if show_previous_week {
            self.daily_values(stat_id, &previous_keys)?
        } else {
            HashMap::new()
        };
        let previous = show_previous_week.then_some(PreviousWeek {
            keys: &previous_keys,
            values: &previous_values,
        });

        let lookup = self.quotas.get_quota(stat_id, week_ending)?;
        let quotas: &[f64] = lookup
            .as_ref()
            .map(|found| found.quota.quotas.as_slice())
            .unwrap_or(&[]);

        let points = project(&slots, &keys, &values, quotas, previous);

        debug!(
            target: "app::reports",
            stat_id,
            %week_ending,
            slots = points.len(),
            recorded = values.len(),
            "weekly cumulative report built"
        );

        Ok(WeeklyCumulativeReport {
            stat_id: definition.id,
            category: definition.category,
            week_ending,
            quota_week_ending: lookup.map(|found| found.quota.week_ending),
            points,
        })
    }

    /// One row per date key present in any linked series. The first line
    /// sits on the primary axis, the rest on the secondary axis.
    pub fn composite_chart(
        &self,
        stat_id: &str,
        period_type: PeriodType,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<CompositeChart> {
        let composite = self.stats.get_definition(stat_id)?;
        if !composite.is_composite() {
            return Err(AppError::validation_with_details(
                "stat is not a composite",
                serde_json::json!({ "statId": stat_id }),
            ));
        }

        let mut lines = Vec::with_capacity(composite.linked_stat_ids.len());
        let mut series = Vec::with_capacity(composite.linked_stat_ids.len());
        for (index, linked_id) in composite.linked_stat_ids.iter().enumerate() {
            let linked = self.stats.get_definition(linked_id)?;
            series.push(
                self.entries
                    .get_entries(linked_id, Some(period_type), start, end)?,
            );
            lines.push(CompositeLine {
                stat_id: linked.id,
                name: linked.name,
                axis: if index == 0 {
                    ChartAxis::Primary
                } else {
                    ChartAxis::Secondary
                },
                is_inverted: linked.is_inverted,
                is_money: linked.is_money,
                is_percentage: linked.is_percentage,
            });
        }

        let rows = composite_merger::merge(&series);
        debug!(
            target: "app::reports",
            stat_id,
            lines = lines.len(),
            rows = rows.len(),
            "composite chart built"
        );

        Ok(CompositeChart {
            stat_id: composite.id,
            name: composite.name,
            period_type,
            lines,
            rows,
        })
    }

    /// Primary series over `[start, end]` with the secondary series moved
    /// back by `offset` periods, so a positive offset compares the primary
    /// against what the secondary did later.
    pub fn overlay_chart(
        &self,
        primary_id: &str,
        secondary_id: &str,
        period_type: PeriodType,
        offset: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<OverlayChart> {
        let primary_definition = self.stats.get_definition(primary_id)?;
        ensure_plain(&primary_definition)?;
        let secondary_definition = self.stats.get_definition(secondary_id)?;
        ensure_plain(&secondary_definition)?;

        let primary = self
            .entries
            .get_entries(primary_id, Some(period_type), Some(start), Some(end))?;

        // One spare period each side covers month-length clamping.
        let fetch_start = shift(start, offset.saturating_sub(1), period_type);
        let fetch_end = shift(end, offset.saturating_add(1), period_type);
        let candidates: Vec<StatEntry> = self.entries.get_entries(
            secondary_id,
            Some(period_type),
            Some(fetch_start.min(fetch_end)),
            Some(fetch_start.max(fetch_end)),
        )?;
        let secondary = overlay(&candidates, offset, period_type, start, end);

        debug!(
            target: "app::reports",
            primary_id,
            secondary_id,
            offset,
            primary = primary.len(),
            secondary = secondary.len(),
            "overlay chart built"
        );

        Ok(OverlayChart {
            primary_stat_id: primary_definition.id,
            secondary_stat_id: secondary_definition.id,
            period_type,
            offset,
            primary,
            secondary,
        })
    }

    fn daily_values(&self, stat_id: &str, keys: &[DateKey]) -> AppResult<HashMap<DateKey, f64>> {
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return Ok(HashMap::new());
        };
        let entries = self.entries.get_entries(
            stat_id,
            Some(PeriodType::Daily),
            Some(first.date),
            Some(last.date),
        )?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.date_key, entry.value))
            .collect())
    }
}

fn ensure_plain(definition: &StatDefinition) -> AppResult<()> {
    if definition.is_composite() {
        return Err(AppError::validation_with_details(
            "composite stats have no series of their own",
            serde_json::json!({ "statId": definition.id }),
        ));
    }
    Ok(())
}
