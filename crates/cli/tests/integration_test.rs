use chrono::{Datelike, Duration, NaiveDate, Weekday};
use sentiment_trade_backtest::{cumulative_returns, generate_returns, BacktestReport};
use sentiment_trade_core::{BacktestConfig, FeatureConfig, TrainerConfig};
use sentiment_trade_data::{CsvStorage, NewsLoader, PriceLoader};
use sentiment_trade_signals::{train, FeatureBuilder};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

const TICKERS: [u32; 10] = [1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008, 1009, 1010];
const NEWS_HEADER: &str = "Time_Stamp_Original(JST)\tHeadline\tCompany_Relevance\tCompany_IDs(TSE)\tQuantitativeScore_Market\tQualitativeScore_Rule\tSentimentScore_Expert\tQualitativeScore_Rule_New";

fn trading_days() -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let last = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
    while day <= last {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}

/// Deterministic sentiment state in -2..=2.
fn tone(day: usize, ticker: usize) -> i32 {
    i32::try_from((day * 7 + ticker * 3 + day / 5) % 5).unwrap() - 2
}

fn forward_return(day: usize, ticker: usize) -> f64 {
    let noise = f64::from(u32::try_from((day * (ticker + 1)) % 3).unwrap()) - 1.0;
    0.003 * f64::from(tone(day, ticker)) + 0.001 * noise
}

/// Writes price files, a news file and a returns matrix; returns the closes.
fn write_inputs(root: &Path, days: &[NaiveDate]) -> BTreeMap<u32, Vec<f64>> {
    let price_dir = root.join("prices").join("tse");
    std::fs::create_dir_all(&price_dir).unwrap();

    let mut closes = BTreeMap::new();
    for (t, ticker) in TICKERS.iter().enumerate() {
        let mut close = 100.0;
        let mut series = Vec::with_capacity(days.len());
        let mut text = String::from("<TICKER>,<PER>,<DATE>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>,<VOL>,<OPENINT>\n");
        for (d, day) in days.iter().enumerate() {
            series.push(close);
            writeln!(
                text,
                "{ticker}.JP,D,{},000000,{close},{close},{close},{close},{},0",
                day.format("%Y%m%d"),
                10_000 + 100 * t
            )
            .unwrap();
            close *= 1.0 + forward_return(d, t);
        }
        std::fs::write(price_dir.join(format!("{ticker}.jp.txt")), text).unwrap();
        closes.insert(*ticker, series);
    }
    std::fs::write(price_dir.join("broken.jp.txt"), "not a price file\n").unwrap();

    let mut news = format!("{NEWS_HEADER}\n");
    for (d, day) in days.iter().enumerate() {
        for (t, ticker) in TICKERS.iter().enumerate() {
            let s = tone(d, t);
            let other = i32::try_from((d * 3 + t) % 5).unwrap() - 2;
            writeln!(
                news,
                "{} 09:00:00\tHeadline\t100\t{ticker}\t{}\t{}\t{}\t",
                day.format("%Y-%m-%d"),
                50 + 20 * s,
                50 + 20 * other,
                50 + 15 * s
            )
            .unwrap();
        }
    }
    // Below relevance and malformed rows are dropped.
    news.push_str("2019-01-02 09:00:00\tNoise\t10\t1001\t90\t90\t90\t90\n");
    news.push_str("garbage\tNoise\t100\t1001\t90\t90\t90\t90\n");
    std::fs::write(root.join("news.tsv"), news).unwrap();

    let mut matrix = String::from("Date");
    for ticker in TICKERS {
        write!(matrix, ",{ticker}").unwrap();
    }
    matrix.push('\n');
    for (d, day) in days.iter().enumerate() {
        matrix.push_str(&day.to_string());
        for ticker in TICKERS {
            if d == 0 {
                matrix.push(',');
            } else {
                let series = &closes[&ticker];
                write!(matrix, ",{}", series[d] / series[d - 1] - 1.0).unwrap();
            }
        }
        matrix.push('\n');
    }
    std::fs::write(root.join("returns.csv"), matrix).unwrap();

    closes
}

#[test]
fn train_then_backtest_on_synthetic_market() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let days = trading_days();
    write_inputs(root, &days);

    // ============================================
    // Load
    // ============================================

    let features_config = FeatureConfig::default();
    let prices = PriceLoader::new(features_config.turnover_window)
        .load_dir(&root.join("prices"))
        .unwrap();
    assert_eq!(prices.files_loaded, TICKERS.len());
    assert_eq!(prices.skipped.len(), 1);
    assert_eq!(prices.records.len(), (days.len() - 1) * TICKERS.len());

    let news = NewsLoader::new(features_config.relevance_threshold)
        .load_file(&root.join("news.tsv"))
        .unwrap();
    assert_eq!(news.scores.len(), days.len() * TICKERS.len());
    assert_eq!(news.below_relevance, 1);
    assert_eq!(news.malformed_rows, 1);

    // ============================================
    // Features and walk-forward
    // ============================================

    let features = FeatureBuilder::new(features_config).build(&prices.records, &news.scores, None);
    assert_eq!(features.rows.len(), prices.records.len());
    assert!(features.rows.iter().all(|r| r.turnover_usd.is_none()));

    let trainer = TrainerConfig {
        lookback_years: 1,
        start_date: NaiveDate::from_ymd_opt(2019, 1, 1),
        parallel: false,
        ..TrainerConfig::default()
    };
    let output = train(&features.rows, &trainer).unwrap();
    assert_eq!(output.windows.len(), 1);
    assert_eq!(output.windows[0].year, 2020);
    assert!(output
        .signals
        .iter()
        .all(|s| s.date >= NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()));

    let mut per_date: BTreeMap<NaiveDate, [usize; 5]> = BTreeMap::new();
    for signal in &output.signals {
        assert!((1..=5).contains(&signal.quintile));
        per_date.entry(signal.date).or_default()[signal.quintile as usize - 1] += 1;
    }
    assert!(per_date.values().all(|counts| counts.iter().all(|c| *c == 2)));

    let signals_file = root.join("out").join("signals.csv");
    CsvStorage::write_signals(&signals_file, &output.signals).unwrap();
    let signals = CsvStorage::read_signals(&signals_file).unwrap();
    assert_eq!(signals, output.signals);

    // ============================================
    // Backtest and statistics
    // ============================================

    let returns = CsvStorage::read_returns_matrix(&root.join("returns.csv")).unwrap();
    let config = BacktestConfig {
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        top_n_signals: 2,
        long_sentiment_threshold: -100.0,
        short_sentiment_threshold: 100.0,
        return_threshold_window: 5,
        zero_return_dates: Vec::new(),
        ..BacktestConfig::default()
    };
    let run = generate_returns(&signals, &returns, &config).unwrap();

    assert_eq!(run.returns.len(), per_date.len());
    assert_eq!(run.diagnostics.lag_ineligible, TICKERS.len());
    assert!(run.returns[0].long_return.is_none());
    assert!(run.selections.len() <= 4 * per_date.len());
    assert!(!run.selections.is_empty());

    let recomputed = cumulative_returns(&run.daily_returns());
    for (stored, expected) in run.cumulative_returns().iter().zip(&recomputed) {
        assert!((stored - expected).abs() < 1e-12);
    }

    let stats = run.statistics().unwrap();
    assert_eq!(stats.observations, per_date.len());
    assert!(stats.max_drawdown <= 0.0);

    let report = BacktestReport::new(&run, None).unwrap();
    assert!(report.render().contains("BACKTEST RESULTS"));

    let returns_file = root.join("out").join("strategy_returns.csv");
    CsvStorage::write_strategy_returns(&returns_file, &run.returns).unwrap();
    let written = std::fs::read_to_string(returns_file).unwrap();
    assert_eq!(written.lines().count(), run.returns.len() + 1);
}
