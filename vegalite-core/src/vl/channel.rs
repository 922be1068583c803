use crate::vl::mark::MarkType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Row,
    Column,
    X,
    Y,
    X2,
    Y2,
    Theta,
    Radius,
    Color,
    Fill,
    Stroke,
    Opacity,
    Size,
    Shape,
    Text,
    Tooltip,
    Href,
    Detail,
    Order,
}

/// Channels that may own a scale, in assembly order
pub const SCALE_CHANNELS: [Channel; 10] = [
    Channel::X,
    Channel::Y,
    Channel::Theta,
    Channel::Radius,
    Channel::Color,
    Channel::Fill,
    Channel::Stroke,
    Channel::Opacity,
    Channel::Size,
    Channel::Shape,
];

/// Non-positional channels whose fields split a stack into layers
pub const STACK_BY_CHANNELS: [Channel; 7] = [
    Channel::Color,
    Channel::Fill,
    Channel::Stroke,
    Channel::Opacity,
    Channel::Size,
    Channel::Shape,
    Channel::Detail,
];

pub const FACET_CHANNELS: [Channel; 2] = [Channel::Row, Channel::Column];

pub const POSITION_SCALE_CHANNELS: [Channel; 2] = [Channel::X, Channel::Y];

impl Channel {
    pub fn name(&self) -> &'static str {
        use Channel::*;
        match self {
            Row => "row",
            Column => "column",
            X => "x",
            Y => "y",
            X2 => "x2",
            Y2 => "y2",
            Theta => "theta",
            Radius => "radius",
            Color => "color",
            Fill => "fill",
            Stroke => "stroke",
            Opacity => "opacity",
            Size => "size",
            Shape => "shape",
            Text => "text",
            Tooltip => "tooltip",
            Href => "href",
            Detail => "detail",
            Order => "order",
        }
    }

    pub fn is_facet(&self) -> bool {
        matches!(self, Channel::Row | Channel::Column)
    }

    pub fn is_position(&self) -> bool {
        matches!(self, Channel::X | Channel::Y)
    }

    pub fn is_secondary_range(&self) -> bool {
        matches!(self, Channel::X2 | Channel::Y2)
    }

    /// x2 and y2 share the scale of x and y
    pub fn scale_channel(&self) -> Channel {
        match self {
            Channel::X2 => Channel::X,
            Channel::Y2 => Channel::Y,
            c => *c,
        }
    }

    pub fn secondary(&self) -> Option<Channel> {
        match self {
            Channel::X => Some(Channel::X2),
            Channel::Y => Some(Channel::Y2),
            _ => None,
        }
    }

    pub fn has_scale(&self) -> bool {
        SCALE_CHANNELS.contains(self)
    }

    pub fn is_color(&self) -> bool {
        matches!(self, Channel::Color | Channel::Fill | Channel::Stroke)
    }

    /// Channels whose range is a discrete set of visual values
    pub fn has_discrete_range(&self) -> bool {
        matches!(self, Channel::Shape | Channel::Row | Channel::Column)
    }

    pub fn is_polar(&self) -> bool {
        matches!(self, Channel::Theta | Channel::Radius)
    }

    pub fn has_legend(&self) -> bool {
        matches!(
            self,
            Channel::Color
                | Channel::Fill
                | Channel::Stroke
                | Channel::Opacity
                | Channel::Size
                | Channel::Shape
        )
    }

    /// Channels accepting a list of field definitions
    pub fn is_multi(&self) -> bool {
        matches!(self, Channel::Detail | Channel::Order | Channel::Tooltip)
    }

    pub fn default_maxbins(&self) -> u32 {
        match self {
            Channel::Row
            | Channel::Column
            | Channel::Size
            | Channel::Color
            | Channel::Fill
            | Channel::Stroke
            | Channel::Opacity
            | Channel::Shape => 6,
            _ => 10,
        }
    }

    pub fn supports_mark(&self, mark: MarkType) -> bool {
        use MarkType::*;
        match self {
            Channel::X | Channel::Y => mark != Arc,
            Channel::X2 | Channel::Y2 => matches!(mark, Rule | Bar | Rect | Area),
            Channel::Theta | Channel::Radius => mark == Arc,
            Channel::Size => matches!(mark, Point | Circle | Square | Tick | Rule | Bar | Text | Line),
            Channel::Shape => mark == Point,
            Channel::Text => mark == Text,
            _ => true,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_channels_use_primary_scale() {
        assert_eq!(Channel::X2.scale_channel(), Channel::X);
        assert_eq!(Channel::Y2.scale_channel(), Channel::Y);
        assert_eq!(Channel::Color.scale_channel(), Channel::Color);
        assert!(!Channel::X2.has_scale());
    }

    #[test]
    fn test_supports_mark() {
        assert!(Channel::Shape.supports_mark(MarkType::Point));
        assert!(!Channel::Shape.supports_mark(MarkType::Bar));
        assert!(Channel::X2.supports_mark(MarkType::Rect));
        assert!(!Channel::X2.supports_mark(MarkType::Point));
        assert!(Channel::Theta.supports_mark(MarkType::Arc));
    }
}
