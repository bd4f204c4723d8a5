//! Terminal styling applied after rendering.
//!
//! The renderer produces plain text. Color is layered on here, per line,
//! using the [`LineRole`] the renderer attached.

use colored::{Color, Colorize};

use super::{Line, LineRole};
use crate::models::Temperature;

/// Turns a rendered line into what gets printed.
pub trait LineStyle {
    fn paint(&self, line: &Line) -> String;
}

/// No styling at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainStyle;

impl LineStyle for PlainStyle {
    fn paint(&self, line: &Line) -> String {
        line.text.clone()
    }
}

/// ANSI colors: bold headers, containers in cyan, threads by temperature.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorStyle;

impl LineStyle for ColorStyle {
    fn paint(&self, line: &Line) -> String {
        match line.role {
            LineRole::GroupHeader => line.text.bold().to_string(),
            LineRole::UngroupedHeader => line.text.bold().dimmed().to_string(),
            LineRole::Thread { temperature } => {
                line.text.color(temperature_color(temperature)).to_string()
            }
            LineRole::Container => line.text.cyan().to_string(),
            LineRole::Separator => line.text.clone(),
        }
    }
}

pub fn temperature_color(temperature: Temperature) -> Color {
    match temperature {
        Temperature::Hot => Color::Red,
        Temperature::Warm => Color::Yellow,
        Temperature::Tepid => Color::Green,
        Temperature::Cold => Color::Blue,
        Temperature::Freezing => Color::BrightBlue,
        Temperature::Frozen => Color::BrightBlack,
    }
}

/// Pick a style from a color preference.
pub fn style_for(color: bool) -> Box<dyn LineStyle> {
    if color {
        Box::new(ColorStyle)
    } else {
        Box::new(PlainStyle)
    }
}

/// Apply `style` to every line.
pub fn paint_lines(lines: &[Line], style: &dyn LineStyle) -> Vec<String> {
    lines.iter().map(|line| style.paint(line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(role: LineRole, text: &str) -> Line {
        Line {
            role,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_plain_style_is_identity() {
        let lines = vec![
            line(LineRole::GroupHeader, "Alpha"),
            line(LineRole::Container, "└── ▣ Box [c1]"),
            line(LineRole::Separator, ""),
        ];
        assert_eq!(
            paint_lines(&lines, &PlainStyle),
            vec!["Alpha", "└── ▣ Box [c1]", ""]
        );
    }

    #[test]
    fn test_color_style_keeps_text_and_blank_lines() {
        let lines = vec![
            line(
                LineRole::Thread {
                    temperature: Temperature::Hot,
                },
                "└── Fix [t1] · hot · ★☆☆☆☆",
            ),
            line(LineRole::Separator, ""),
        ];
        let painted = paint_lines(&lines, &ColorStyle);
        assert!(painted[0].contains("└── Fix [t1] · hot · ★☆☆☆☆"));
        assert_eq!(painted[1], "");
    }

    #[test]
    fn test_every_temperature_has_a_distinct_color() {
        let all = [
            Temperature::Hot,
            Temperature::Warm,
            Temperature::Tepid,
            Temperature::Cold,
            Temperature::Freezing,
            Temperature::Frozen,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(temperature_color(*a), temperature_color(*b));
            }
        }
    }
}
