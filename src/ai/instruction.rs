use crate::geometry::{PixelPoint, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleFactor {
    X2,
    X4,
}

impl UpscaleFactor {
    pub fn from_multiplier(multiplier: u32) -> Option<Self> {
        match multiplier {
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            _ => None,
        }
    }

    pub const fn multiplier(self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }
}

/// What the service is asked to do, one variant per editing action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditInstruction {
    Retouch {
        prompt: String,
        hotspot: PixelPoint,
        with_reference: bool,
    },
    Filter {
        prompt: String,
    },
    Adjustment {
        prompt: String,
    },
    Expand {
        prompt: Option<String>,
        target: Size,
        offset: PixelPoint,
        source: Size,
    },
    Upscale {
        factor: UpscaleFactor,
    },
    Generate {
        prompt: String,
    },
}

impl EditInstruction {
    pub fn instruction_text(&self) -> String {
        match self {
            Self::Retouch {
                prompt,
                hotspot,
                with_reference,
            } => {
                let reference = if *with_reference {
                    " Use the second image as a visual reference for the change."
                } else {
                    ""
                };
                format!(
                    "Perform a localized, photorealistic edit on the provided image. \
                     User request: \"{prompt}\". Edit location: focus on the area around \
                     pixel coordinates (x: {x}, y: {y}). Blend the change seamlessly and \
                     leave the rest of the image identical to the original.{reference} \
                     Return only the final edited image.",
                    x = hotspot.x,
                    y = hotspot.y,
                )
            }
            Self::Filter { prompt } => format!(
                "Apply a stylistic filter to the entire image based on this request: \
                 \"{prompt}\". Do not change the composition or content. \
                 Return only the final filtered image."
            ),
            Self::Adjustment { prompt } => format!(
                "Perform a natural, global adjustment to the entire image based on this \
                 request: \"{prompt}\". Keep the result photorealistic. \
                 Return only the final adjusted image."
            ),
            Self::Expand {
                prompt,
                target,
                offset,
                source,
            } => {
                let guidance = match prompt.as_deref().map(str::trim) {
                    Some(prompt) if !prompt.is_empty() => {
                        format!(" Content guidance for the new areas: \"{prompt}\".")
                    }
                    _ => String::new(),
                };
                format!(
                    "The provided image is a {tw}x{th} canvas. The original {sw}x{sh} photo \
                     sits at offset (x: {ox}, y: {oy}); every other pixel is transparent. \
                     Fill the transparent areas so they extend the photo seamlessly, matching \
                     lighting, perspective and texture. Do not alter the original pixels.\
                     {guidance} Return only the final {tw}x{th} image.",
                    tw = target.width,
                    th = target.height,
                    sw = source.width,
                    sh = source.height,
                    ox = offset.x,
                    oy = offset.y,
                )
            }
            Self::Upscale { factor } => format!(
                "Upscale the provided image by {}x, restoring fine detail and sharpness \
                 without changing content, colors or composition. \
                 Return only the final upscaled image.",
                factor.multiplier()
            ),
            Self::Generate { prompt } => format!(
                "Generate a single high-quality photorealistic image of: \"{prompt}\". \
                 Return only the image."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upscale_factor_accepts_only_two_and_four() {
        assert_eq!(UpscaleFactor::from_multiplier(2), Some(UpscaleFactor::X2));
        assert_eq!(UpscaleFactor::from_multiplier(4), Some(UpscaleFactor::X4));
        assert_eq!(UpscaleFactor::from_multiplier(3), None);
        assert_eq!(UpscaleFactor::X4.multiplier(), 4);
    }

    #[test]
    fn retouch_text_carries_prompt_and_natural_hotspot() {
        let text = EditInstruction::Retouch {
            prompt: "remove the lamp".to_string(),
            hotspot: PixelPoint::new(640, 212),
            with_reference: false,
        }
        .instruction_text();
        assert!(text.contains("remove the lamp"));
        assert!(text.contains("x: 640, y: 212"));
        assert!(!text.contains("reference"));
    }

    #[test]
    fn retouch_text_mentions_reference_only_when_attached() {
        let text = EditInstruction::Retouch {
            prompt: "swap the shirt".to_string(),
            hotspot: PixelPoint::new(1, 2),
            with_reference: true,
        }
        .instruction_text();
        assert!(text.contains("second image as a visual reference"));
    }

    #[test]
    fn expand_text_describes_canvas_layout() {
        let text = EditInstruction::Expand {
            prompt: Some("  ".to_string()),
            target: Size::new(1100, 800),
            offset: PixelPoint::new(0, 0),
            source: Size::new(1000, 800),
        }
        .instruction_text();
        assert!(text.contains("1100x800 canvas"));
        assert!(text.contains("original 1000x800 photo"));
        assert!(!text.contains("Content guidance"));
    }

    #[test]
    fn each_prompted_variant_embeds_its_prompt() {
        for instruction in [
            EditInstruction::Filter {
                prompt: "noir".to_string(),
            },
            EditInstruction::Adjustment {
                prompt: "noir".to_string(),
            },
            EditInstruction::Generate {
                prompt: "noir".to_string(),
            },
            EditInstruction::Expand {
                prompt: Some("noir".to_string()),
                target: Size::new(2, 2),
                offset: PixelPoint::new(0, 0),
                source: Size::new(1, 1),
            },
        ] {
            assert!(instruction.instruction_text().contains("\"noir\""));
        }
    }
}
