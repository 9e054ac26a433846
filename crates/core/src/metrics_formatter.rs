#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]

use crate::statistics::PerformanceStatistics;
use chrono::NaiveDate;

pub struct MetricsFormatter;

impl MetricsFormatter {
    /// Renders strategy statistics, side by side with the benchmark when one is given.
    #[must_use]
    pub fn format(
        period: (NaiveDate, NaiveDate),
        strategy: &PerformanceStatistics,
        benchmark: Option<&PerformanceStatistics>,
    ) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                    BACKTEST RESULTS                           \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        // Time Period
        output.push_str("Time Period\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Start:                 {}\n", period.0.format("%Y-%m-%d")));
        output.push_str(&format!("End:                   {}\n", period.1.format("%Y-%m-%d")));
        output.push_str(&format!("Trading Days:          {}\n", strategy.observations));
        output.push('\n');

        output.push_str(&format!("{:<23}{:>14}{:>14}\n", "", "Strategy", "Benchmark"));
        output.push_str("───────────────────────────────────────────────────────────────\n");
        Self::push_row(
            &mut output,
            "Total Return",
            Some(strategy.total_return()),
            benchmark.map(PerformanceStatistics::total_return),
            true,
        );
        Self::push_row(
            &mut output,
            "Annualized Return",
            Some(strategy.annualized_return),
            benchmark.map(|b| b.annualized_return),
            true,
        );
        Self::push_row(
            &mut output,
            "Sharpe Ratio",
            strategy.sharpe_ratio,
            benchmark.and_then(|b| b.sharpe_ratio),
            false,
        );
        Self::push_row(
            &mut output,
            "Max Drawdown",
            Some(strategy.max_drawdown),
            benchmark.map(|b| b.max_drawdown),
            true,
        );
        Self::push_row(
            &mut output,
            "Calmar Ratio",
            strategy.calmar_ratio,
            benchmark.and_then(|b| b.calmar_ratio),
            false,
        );

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if (strategy.final_cumulative_return - 1.0).abs() < f64::EPSILON
            && strategy.sharpe_ratio.is_none()
        {
            output.push_str("\n⚠️  The strategy never held a position in this period.\n");
            output.push_str("    Consider loosening the selection thresholds or date range.\n\n");
        }

        output
    }

    fn push_row(
        output: &mut String,
        label: &str,
        strategy: Option<f64>,
        benchmark: Option<f64>,
        percent: bool,
    ) {
        let render = |value: Option<f64>| match value {
            Some(v) if percent => format!("{:.2}%", v * 100.0),
            Some(v) => format!("{:.4}", v),
            None => "N/A".to_string(),
        };
        output.push_str(&format!(
            "{:<23}{:>14}{:>14}\n",
            format!("{label}:"),
            render(strategy),
            render(benchmark)
        ));
    }
}
