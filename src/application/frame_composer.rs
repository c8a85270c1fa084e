// Frame composer - Pure mapping from weather state to pixels
use crate::domain::airport::AirportCode;
use crate::domain::frame::{DisplayMode, Frame};
use crate::domain::weather::{FlightRules, WeatherCondition, WeatherSnapshot};
use crate::infrastructure::icon_catalog::{
    Icon, IconKind, PLACEHOLDER_RING, SmallGlyph, icon_frames, wind_arrow,
};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_4X6;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

/// Ticks spent on each icon animation frame.
const TICKS_PER_ICON_FRAME: u32 = 10;

const STATUS_BAR_HEIGHT: u32 = 2;
const MARGIN: i32 = 2;
const PLACEHOLDER_TEXT: &str = "--";

const STATION: Rgb888 = Rgb888::WHITE;
const TEMPERATURE: Rgb888 = Rgb888::new(255, 200, 0);
const WIND_TEXT: Rgb888 = Rgb888::new(0, 255, 200);
const WIND_ARROW: Rgb888 = Rgb888::new(255, 100, 0);
const VISIBILITY: Rgb888 = Rgb888::new(100, 200, 255);
const ALTIMETER: Rgb888 = Rgb888::new(200, 255, 100);
const CLOUD_TEXT: Rgb888 = Rgb888::new(200, 200, 200);
const NEUTRAL: Rgb888 = Rgb888::new(128, 128, 128);
const AIRPLANE: Rgb888 = Rgb888::new(0, 200, 255);

/// Fixed flight-category palette.
pub fn flight_rules_color(rules: FlightRules) -> Rgb888 {
    match rules {
        FlightRules::Vfr => Rgb888::new(0, 255, 0),
        FlightRules::Mvfr => Rgb888::new(0, 0, 255),
        FlightRules::Ifr => Rgb888::new(255, 0, 0),
        FlightRules::Lifr => Rgb888::new(255, 0, 255),
    }
}

/// Builds complete frames for a fixed panel size. Holds no state between calls:
/// the same inputs always produce the same frame.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    width: u16,
    height: u16,
}

impl FrameComposer {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn compose(&self, snapshot: &WeatherSnapshot, mode: DisplayMode, phase: u32) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        let category = flight_rules_color(snapshot.flight_rules());

        Rectangle::new(Point::zero(), Size::new(u32::from(self.width), STATUS_BAR_HEIGHT))
            .into_styled(PrimitiveStyle::with_fill(category))
            .draw(&mut frame)
            .ok();
        let station = Point::new(MARGIN, 4);
        draw_text(&mut frame, snapshot.airport().as_str(), station, STATION, Alignment::Left);

        match mode {
            DisplayMode::Main => self.compose_main(&mut frame, snapshot, category, phase),
            DisplayMode::Info => self.compose_info(&mut frame, snapshot),
        }
        frame
    }

    /// "Acquiring data" screen shown until the first observation arrives.
    pub fn compose_placeholder(&self, airport: &AirportCode, phase: u32) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        let center_x = i32::from(self.width) / 2;

        let airplane = &icon_frames(IconKind::Airplane)[0];
        draw_icon(&mut frame, airplane, Point::new(center_x - 4, 4), AIRPLANE);

        // Aligned against the widest label so the dots grow without shifting the text.
        let dots = ((phase / TICKS_PER_ICON_FRAME) % 4) as usize;
        let label = format!("LOAD{}", ".".repeat(dots));
        let label_x = center_x - text_width("LOAD...") / 2;
        draw_text(&mut frame, &label, Point::new(label_x, 15), STATION, Alignment::Left);

        let code = Point::new(center_x, 22);
        draw_text(&mut frame, airport.as_str(), code, NEUTRAL, Alignment::Center);
        frame
    }

    fn compose_main(
        &self,
        frame: &mut Frame,
        snapshot: &WeatherSnapshot,
        category: Rgb888,
        phase: u32,
    ) {
        let width = i32::from(self.width);
        let height = i32::from(self.height);
        let right = Point::new(width - MARGIN, 4);

        let temperature = snapshot
            .temperature_c()
            .map(|t| format!("{}C", t))
            .unwrap_or_else(|| PLACEHOLDER_TEXT.to_string());
        draw_text(frame, &temperature, right, TEMPERATURE, Alignment::Right);

        draw_condition_icon(frame, snapshot.weather_condition(), Point::new(4, 12), phase);

        let wind_x = (width - 24).max(16);
        let speed = match snapshot.wind_speed_kt() {
            Some(0) => "CALM".to_string(),
            Some(kt) => format!("{}KT", kt),
            None => PLACEHOLDER_TEXT.to_string(),
        };
        draw_text(frame, &speed, Point::new(wind_x, 12), WIND_TEXT, Alignment::Left);

        let arrow_origin = Point::new(wind_x + 4, 19);
        match (snapshot.wind_speed_kt(), snapshot.wind_direction_deg()) {
            (Some(kt), Some(deg)) if kt > 0 => {
                draw_small_glyph(frame, &wind_arrow(deg), arrow_origin, WIND_ARROW)
            }
            _ => draw_small_glyph(frame, &PLACEHOLDER_RING, arrow_origin, NEUTRAL),
        }

        let label = Point::new(MARGIN, height - FONT_4X6.character_size.height as i32 - 2);
        draw_text(frame, snapshot.flight_rules().label(), label, category, Alignment::Left);
    }

    fn compose_info(&self, frame: &mut Frame, snapshot: &WeatherSnapshot) {
        let right_x = i32::from(self.width) - MARGIN;

        let time = snapshot
            .observed_at()
            .map(|t| t.format("%H%MZ").to_string())
            .unwrap_or_else(|| "----Z".to_string());
        draw_text(frame, &time, Point::new(right_x, 4), NEUTRAL, Alignment::Right);

        let visibility = snapshot
            .visibility_sm()
            .map(format_visibility)
            .unwrap_or_else(|| PLACEHOLDER_TEXT.to_string());
        let visibility = format!("VIS {}", visibility);
        draw_text(frame, &visibility, Point::new(MARGIN, 11), VISIBILITY, Alignment::Left);

        let altimeter = snapshot
            .altimeter_inhg()
            .map(|a| format!("{:.2}", a))
            .unwrap_or_else(|| PLACEHOLDER_TEXT.to_string());
        let altimeter = format!("ALT {}", altimeter);
        draw_text(frame, &altimeter, Point::new(MARGIN, 18), ALTIMETER, Alignment::Left);

        let cloud_origin = Point::new(MARGIN, 25);
        match snapshot.cloud_layers().first() {
            Some(layer) => {
                let text = format!("{}{:03}", layer.coverage.code(), layer.altitude_ft / 100);
                draw_text(frame, &text, cloud_origin, CLOUD_TEXT, Alignment::Left);
            }
            None => draw_text(frame, "---", cloud_origin, NEUTRAL, Alignment::Left),
        }

        let dewpoint = snapshot
            .dewpoint_c()
            .map(|d| format!("DP{}", d))
            .unwrap_or_else(|| format!("DP{}", PLACEHOLDER_TEXT));
        draw_text(frame, &dewpoint, Point::new(right_x, 25), TEMPERATURE, Alignment::Right);
    }
}

/// Statute miles the way a METAR writes them: whole miles, quarter fractions
/// ("1/4SM", "1 1/2SM"), otherwise the reported decimal unrounded.
fn format_visibility(sm: f64) -> String {
    let whole = sm.trunc();
    let quarters = (sm.fract() * 4.0).round();
    if ((sm.fract() * 4.0) - quarters).abs() > 1e-9 {
        return format!("{}SM", sm);
    }

    let fraction = match quarters as u8 {
        1 => "1/4",
        2 => "1/2",
        3 => "3/4",
        // Whole miles, or a fraction that rounded up to the next mile.
        _ => return format!("{:.0}SM", whole + quarters / 4.0),
    };
    if whole >= 1.0 {
        format!("{:.0} {}SM", whole, fraction)
    } else {
        format!("{}SM", fraction)
    }
}

fn draw_condition_icon(frame: &mut Frame, condition: WeatherCondition, origin: Point, phase: u32) {
    let (base, overlay) = match condition {
        WeatherCondition::Clear => (None, (IconKind::Sun, TEMPERATURE)),
        WeatherCondition::Cloudy => (None, (IconKind::Cloud, Rgb888::new(180, 180, 180))),
        WeatherCondition::Fog => (None, (IconKind::Fog, Rgb888::new(150, 150, 150))),
        WeatherCondition::Rain => (
            Some(Rgb888::new(150, 150, 150)),
            (IconKind::Rain, Rgb888::new(100, 100, 255)),
        ),
        WeatherCondition::Snow => (
            Some(Rgb888::new(200, 200, 200)),
            (IconKind::Snow, Rgb888::new(200, 220, 255)),
        ),
        WeatherCondition::Thunderstorm => (
            Some(Rgb888::new(100, 100, 100)),
            (IconKind::Lightning, Rgb888::new(255, 255, 0)),
        ),
    };

    if let Some(cloud_color) = base {
        draw_icon(frame, &icon_frames(IconKind::Cloud)[0], origin - Point::new(0, 2), cloud_color);
    }
    let (kind, color) = overlay;
    draw_icon(frame, animation_frame(icon_frames(kind), phase), origin, color);
}

fn animation_frame(frames: &[Icon], phase: u32) -> &Icon {
    let index = (phase / TICKS_PER_ICON_FRAME) as usize % frames.len();
    &frames[index]
}

fn text_width(text: &str) -> i32 {
    (text.chars().count() as u32 * FONT_4X6.character_size.width) as i32
}

fn draw_text(frame: &mut Frame, text: &str, position: Point, color: Rgb888, alignment: Alignment) {
    let character_style = MonoTextStyle::new(&FONT_4X6, color);
    let text_style = TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, position, character_style, text_style)
        .draw(frame)
        .ok();
}

fn draw_icon(frame: &mut Frame, icon: &Icon, origin: Point, color: Rgb888) {
    draw_bits(frame, icon, 8, origin, color);
}

fn draw_small_glyph(frame: &mut Frame, glyph: &SmallGlyph, origin: Point, color: Rgb888) {
    draw_bits(frame, glyph, 5, origin, color);
}

/// Lit bits become pixels; unset bits leave the frame untouched.
fn draw_bits(frame: &mut Frame, rows: &[u8], width: i32, origin: Point, color: Rgb888) {
    let pixels = rows.iter().enumerate().flat_map(move |(row, bits)| {
        let bits = *bits;
        (0..width)
            .filter(move |col| bits & (1u8 << (width - 1 - col)) != 0)
            .map(move |col| Pixel(origin + Point::new(col, row as i32), color))
    });
    frame.draw_iter(pixels).ok();
}
