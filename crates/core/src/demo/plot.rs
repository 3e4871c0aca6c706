use std::fmt::Write;

const MIN_DB: f64 = -60.0;
const MAX_DB: f64 = 24.0;
const LOG_LOW: f64 = 0.001;
const NYQUIST: f64 = 0.5;

/// Frequency axis of a response plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FreqAxis {
    Linear,
    Log,
}

impl FreqAxis {
    fn low(self) -> f64 {
        match self {
            Self::Linear => 0.0,
            Self::Log => LOG_LOW,
        }
    }

    fn unit(self, freq: f64) -> f64 {
        match self {
            Self::Linear => freq / NYQUIST,
            Self::Log => (freq.max(LOG_LOW) / LOG_LOW).ln() / (NYQUIST / LOG_LOW).ln(),
        }
    }

    fn at(self, unit: f64) -> f64 {
        match self {
            Self::Linear => unit * NYQUIST,
            Self::Log => LOG_LOW * (NYQUIST / LOG_LOW).powf(unit),
        }
    }
}

/// SVG figure of a magnitude response, -60..24 dB against frequency up to
/// Nyquist.
#[derive(Debug)]
pub struct ResponsePlot {
    width: f64,
    height: f64,
    axis: FreqAxis,
    lines: Vec<String>,
}

impl ResponsePlot {
    pub fn new(width: f64, height: f64, axis: FreqAxis) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            axis,
            lines: Vec::new(),
        }
    }

    /// Frequencies to sample, one per horizontal pixel.
    pub fn sample_points(&self) -> Vec<f64> {
        let count = self.width.round().max(2.0) as usize;
        (0..count)
            .map(|index| self.axis.at(index as f64 / (count - 1) as f64))
            .collect()
    }

    pub fn line(&mut self, class: &str, points: impl IntoIterator<Item = (f64, f64)>) {
        let mut path = String::new();
        for (freq, db) in points {
            let (x, y) = self.project(freq, db);
            let _ = write!(path, "{x:.2},{y:.2} ");
        }
        self.lines.push(format!(
            r#"<polyline class="{class}" fill="none" stroke="currentColor" points="{}"/>"#,
            path.trim_end()
        ));
    }

    pub fn marker(&mut self, freq: f64, db: f64) {
        let (x, y) = self.project(freq, db);
        self.lines
            .push(format!(r#"<circle class="marker" cx="{x:.2}" cy="{y:.2}" r="3"/>"#));
    }

    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let (_, zero) = self.project(self.axis.low(), 0.0);
        let _ = write!(
            svg,
            r#"<line class="major" x1="0" y1="{zero:.2}" x2="{}" y2="{zero:.2}"/>"#,
            self.width
        );
        for line in &self.lines {
            svg.push_str(line);
        }
        svg.push_str("</svg>");
        svg
    }

    fn project(&self, freq: f64, db: f64) -> (f64, f64) {
        let x = self.axis.unit(freq).clamp(0.0, 1.0) * self.width;
        let y = (MAX_DB - db.clamp(MIN_DB, MAX_DB)) / (MAX_DB - MIN_DB) * self.height;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_onto_the_canvas() {
        let plot = ResponsePlot::new(200.0, 84.0, FreqAxis::Linear);
        assert_eq!(plot.project(0.0, 24.0), (0.0, 0.0));
        assert_eq!(plot.project(0.5, -60.0), (200.0, 84.0));
        assert_eq!(plot.project(0.25, -300.0), (100.0, 84.0));
    }

    #[test]
    fn log_axis_starts_above_dc() {
        let plot = ResponsePlot::new(50.0, 50.0, FreqAxis::Log);
        let points = plot.sample_points();
        assert_eq!(points.len(), 50);
        assert!((points[0] - LOG_LOW).abs() < 1e-12);
        assert!((points[49] - NYQUIST).abs() < 1e-12);
    }

    #[test]
    fn svg_contains_lines_and_markers() {
        let mut plot = ResponsePlot::new(100.0, 50.0, FreqAxis::Linear);
        plot.line("response", [(0.0, 0.0), (0.5, -60.0)]);
        plot.marker(0.1, -3.0);
        let svg = plot.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"points="0.00,14.29 100.00,50.00""#));
        assert!(svg.contains("<circle"));
    }
}
