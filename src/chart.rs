//! PNG temperature chart for a city's stored readings.

use std::io::Cursor;

use chrono::{DateTime, Duration, NaiveDateTime};
use image::{ImageFormat, RgbImage};
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;

use crate::error::{AppError, AppResult};
use crate::models::WeatherReading;

// ---

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;

fn chart_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}

/// Line colors, assigned to series in order.
const SERIES_COLORS: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];

/// One plotted line: legend label and time-ordered points.
type Series = (String, Vec<(NaiveDateTime, f64)>);

/// Render temperature over observation time as a PNG.
///
/// Readings are plotted in timestamp order. A city with no readings is a
/// [`AppError::NotFound`].
pub fn render_temperature_chart(city: &str, readings: &[WeatherReading]) -> AppResult<Vec<u8>> {
    // ---
    let points = time_points(readings);
    if points.is_empty() {
        return Err(AppError::NotFound(format!("no readings recorded for {city}")));
    }

    render(
        &format!("Temperature Over Time - {city}"),
        &[("Temperature".to_string(), points)],
    )
}

/// Render one temperature line per city on shared axes.
///
/// Cities without readings are left out of the plot. If none of them has
/// readings the result is [`AppError::NotFound`].
pub fn render_temperature_comparison(cities: &[(String, Vec<WeatherReading>)]) -> AppResult<Vec<u8>> {
    // ---
    let series: Vec<Series> = cities
        .iter()
        .map(|(city, readings)| (city.clone(), time_points(readings)))
        .filter(|(_, points)| !points.is_empty())
        .collect();

    if series.is_empty() {
        let names: Vec<&str> = cities.iter().map(|(c, _)| c.as_str()).collect();
        return Err(AppError::NotFound(format!("no readings recorded for {}", names.join(", "))));
    }

    let plotted: Vec<&str> = series.iter().map(|(c, _)| c.as_str()).collect();
    render(&format!("Temperature Comparison: {}", plotted.join(", ")), &series)
}

fn time_points(readings: &[WeatherReading]) -> Vec<(NaiveDateTime, f64)> {
    // ---
    let mut points: Vec<(NaiveDateTime, f64)> = readings
        .iter()
        .filter_map(|r| DateTime::from_timestamp(r.observed_at, 0).map(|dt| (dt.naive_utc(), r.temperature)))
        .collect();
    points.sort_by_key(|(ts, _)| *ts);
    points
}

/// Draw non-empty series onto a PNG canvas.
fn render(title: &str, series: &[Series]) -> AppResult<Vec<u8>> {
    // ---
    let all_points = || series.iter().flat_map(|(_, points)| points.iter());

    let (Some(first), Some(last)) = (
        all_points().map(|(ts, _)| *ts).min(),
        all_points().map(|(ts, _)| *ts).max(),
    ) else {
        return Err(AppError::Chart("nothing to plot".into()));
    };

    // A single observation time still needs a non-empty time axis
    let (x_start, x_end) = if first == last {
        (first - Duration::minutes(30), last + Duration::minutes(30))
    } else {
        (first, last)
    };

    let (min_temp, max_temp) = all_points()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, t)| (lo.min(*t), hi.max(*t)));
    let y_padding = if (max_temp - min_temp).abs() > 1e-6 {
        (max_temp - min_temp) * 0.1
    } else {
        1.0
    };

    let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(
                RangedDateTime::from(x_start..x_end),
                (min_temp - y_padding)..(max_temp + y_padding),
            )
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Timestamp")
            .y_desc("Temperature (°C)")
            .x_label_formatter(&|dt: &NaiveDateTime| dt.format("%m-%d %H:%M").to_string())
            .light_line_style(BLACK.mix(0.15))
            .draw()
            .map_err(chart_err)?;

        for (i, (label, points)) in series.iter().enumerate() {
            let color = SERIES_COLORS[i % SERIES_COLORS.len()];

            chart
                .draw_series(LineSeries::new(points.iter().copied(), &color))
                .map_err(chart_err)?
                .label(label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, 3, color.filled())))
                .map_err(chart_err)?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    let image = RgbImage::from_raw(WIDTH, HEIGHT, buffer)
        .ok_or_else(|| AppError::Chart("bitmap buffer has the wrong size".into()))?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).map_err(chart_err)?;

    Ok(png.into_inner())
}
