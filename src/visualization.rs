//! Visualization utilities for tours.
//!
//! Generates SVG renderings of a tour as a closed polyline over the city
//! coordinates, and of the optimizer's length-vs-iteration history.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

#[cfg(feature = "resvg")]
use resvg::render;
#[cfg(feature = "resvg")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "resvg")]
use resvg::usvg;
#[cfg(feature = "resvg")]
use resvg::usvg::TreeParsing;
#[cfg(feature = "resvg")]
use resvg::FitTo;

use crate::error::{Result, SolverError};
use crate::instance::TspInstance;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// City marker radius
    pub node_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 6.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a tour over the instance coordinates.
    ///
    /// Fails for matrix-file instances, which carry no geometry.
    pub fn generate_tour_svg(
        &self,
        instance: &TspInstance,
        tour: &[usize],
        length: f64,
    ) -> Result<String> {
        if !instance.has_coordinates() {
            return Err(SolverError::InvalidInput(
                "instance has no coordinates to plot".into(),
            ));
        }

        let (min_x, max_x, min_y, max_y) = self.get_bounds(instance);
        let scale_x = (self.width - 2.0 * self.margin) / (max_x - min_x).max(1.0);
        let scale_y = (self.height - 2.0 * self.margin) / (max_y - min_y).max(1.0);
        let scale = scale_x.min(scale_y);

        let project = |x: f64, y: f64| {
            (
                self.margin + (x - min_x) * scale,
                self.height - self.margin - (y - min_y) * scale,
            )
        };

        let mut svg = String::new();
        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .node {{ fill: #3498db; stroke: #2c3e50; stroke-width: 2; }}
    .start {{ fill: #e74c3c; stroke: #c0392b; stroke-width: 2; }}
    .edge {{ stroke: #34495e; stroke-width: 2; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            self.width, self.height, self.width, self.height
        ));

        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">Instance: {} | Length: {:.2} | Cities: {}</text>
"##,
            self.margin,
            instance.name,
            length,
            instance.dimension()
        ));

        // closed polyline over the visiting order
        let mut points = String::new();
        for &city in tour {
            let (px, py) = project(instance.cities[city].x, instance.cities[city].y);
            points.push_str(&format!("{:.1},{:.1} ", px, py));
        }
        if let Some(&first) = tour.first() {
            let (px, py) = project(instance.cities[first].x, instance.cities[first].y);
            points.push_str(&format!("{:.1},{:.1}", px, py));
        }
        svg.push_str(&format!(
            r##"<polyline class="edge" points="{}"/>
"##,
            points.trim_end()
        ));

        for city in &instance.cities {
            let (px, py) = project(city.x, city.y);
            let class = if Some(&city.id) == tour.first() {
                "start"
            } else {
                "node"
            };
            svg.push_str(&format!(
                r##"<circle class="{}" cx="{:.1}" cy="{:.1}" r="{}"/>
"##,
                class, px, py, self.node_radius
            ));
            if instance.dimension() <= 100 {
                svg.push_str(&format!(
                    r##"<text class="label" x="{:.1}" y="{:.1}">{}</text>
"##,
                    px + self.node_radius + 2.0,
                    py - 2.0,
                    city.id
                ));
            }
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }

    /// Render the length-vs-iteration history as a line plot.
    pub fn generate_convergence_svg(&self, history: &[f64]) -> String {
        let mut svg = String::new();
        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .curve {{ stroke: #2980b9; stroke-width: 2; fill: none; }}
    .axis {{ stroke: #2c3e50; stroke-width: 1; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
<text x="{}" y="25" class="title">Tour length per improvement</text>
"##,
            self.width, self.height, self.width, self.height, self.margin
        ));

        // axes
        svg.push_str(&format!(
            r##"<line class="axis" x1="{0}" y1="{1}" x2="{2}" y2="{1}"/>
<line class="axis" x1="{0}" y1="{3}" x2="{0}" y2="{1}"/>
"##,
            self.margin,
            self.height - self.margin,
            self.width - self.margin,
            self.margin
        ));

        if !history.is_empty() {
            let min = history.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let span = (max - min).max(1e-9);
            let steps = (history.len().saturating_sub(1)).max(1) as f64;

            let mut points = String::new();
            for (k, &value) in history.iter().enumerate() {
                let px = self.margin + (k as f64 / steps) * (self.width - 2.0 * self.margin);
                let py = self.height
                    - self.margin
                    - ((value - min) / span) * (self.height - 2.0 * self.margin);
                points.push_str(&format!("{:.1},{:.1} ", px, py));
            }
            svg.push_str(&format!(
                r##"<polyline class="curve" points="{}"/>
"##,
                points.trim_end()
            ));

            svg.push_str(&format!(
                r##"<text class="label" x="{}" y="{}">{:.2}</text>
<text class="label" x="{}" y="{}">{:.2}</text>
"##,
                5.0,
                self.height - self.margin,
                min,
                5.0,
                self.margin,
                max
            ));
        }

        svg.push_str("</svg>\n");
        svg
    }

    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG. Renders natively when the `resvg` feature is on,
    /// otherwise shells out to `rsvg-convert`, `magick` or `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let path = path.as_ref();

        #[cfg(feature = "resvg")]
        {
            let opt = usvg::Options::default();
            let rtree = usvg::Tree::from_str(svg, &opt).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::Other, format!("usvg parse error: {}", e))
            })?;
            let w = self.width as u32;
            let h = self.height as u32;
            let mut pixmap = Pixmap::new(w.max(1), h.max(1)).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "Failed to create pixmap")
            })?;
            render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut()).ok_or_else(
                || std::io::Error::new(std::io::ErrorKind::Other, "resvg render failed"),
            )?;
            pixmap.save_png(path).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::Other, format!("save_png failed: {}", e))
            })?;
            return Ok(());
        }

        #[allow(unreachable_code)]
        {
            let tmp_svg = path.with_extension("svg.tmp");
            {
                let mut f = File::create(&tmp_svg)?;
                f.write_all(svg.as_bytes())?;
            }

            if let Ok(status) = Command::new("rsvg-convert")
                .args(["-o", path.to_string_lossy().as_ref(), tmp_svg.to_string_lossy().as_ref()])
                .status()
            {
                if status.success() {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
            }

            if let Ok(status) = Command::new("magick")
                .args([
                    "convert",
                    tmp_svg.to_string_lossy().as_ref(),
                    path.to_string_lossy().as_ref(),
                ])
                .status()
            {
                if status.success() {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
            }

            if let Ok(status) = Command::new("inkscape")
                .args([
                    tmp_svg.to_string_lossy().as_ref(),
                    "--export-type=png",
                    "--export-filename",
                    path.to_string_lossy().as_ref(),
                ])
                .status()
            {
                if status.success() {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
            }

            let _ = std::fs::remove_file(&tmp_svg);
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No SVG->PNG converter succeeded (tried resvg, rsvg-convert, magick, inkscape)",
            ))
        }
    }

    fn get_bounds(&self, instance: &TspInstance) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for city in &instance.cities {
            min_x = min_x.min(city.x);
            max_x = max_x.max(city.x);
            min_y = min_y.min(city.y);
            max_y = max_y.max(city.y);
        }

        (min_x, max_x, min_y, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn square_instance() -> TspInstance {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 0.0, 1.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 1.0, 0.0),
        ];
        TspInstance::from_cities("square", cities).unwrap()
    }

    #[test]
    fn test_tour_svg_contains_cities_and_polyline() {
        let instance = square_instance();
        let viz = Visualizer::new();
        let svg = viz
            .generate_tour_svg(&instance, &[0, 1, 2, 3], 4.0)
            .unwrap();

        assert!(svg.contains("<polyline"));
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains("Length: 4.00"));
    }

    #[test]
    fn test_tour_svg_requires_coordinates() {
        let matrix =
            crate::instance::DistanceMatrix::from_rows(vec![vec![0.0, 7.0], vec![7.0, 0.0]])
                .unwrap();
        let instance = TspInstance::from_matrix("bare", matrix);
        let viz = Visualizer::new();
        assert!(viz.generate_tour_svg(&instance, &[0, 1], 14.0).is_err());
    }

    #[test]
    fn test_convergence_svg_handles_flat_history() {
        let viz = Visualizer::new();
        let svg = viz.generate_convergence_svg(&[5.0, 5.0, 5.0]);
        assert!(svg.contains("<polyline"));

        let empty = viz.generate_convergence_svg(&[]);
        assert!(empty.contains("</svg>"));
    }
}
