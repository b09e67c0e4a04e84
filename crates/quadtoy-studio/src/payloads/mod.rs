//! Shaders the studio can run, by name.

use quadtoy_engine::ShaderToy;

mod gradient;
mod mandelbulb;

pub struct Payload {
    pub name: &'static str,
    pub build: fn() -> ShaderToy,
}

pub const PAYLOADS: &[Payload] = &[
    Payload { name: "gradient", build: gradient::toy },
    Payload { name: "mandelbulb", build: mandelbulb::toy },
];

pub const DEFAULT: &str = "mandelbulb";

pub fn find(name: &str) -> Option<&'static Payload> {
    PAYLOADS.iter().find(|p| p.name == name)
}

pub fn names() -> Vec<&'static str> {
    PAYLOADS.iter().map(|p| p.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_payload_exists() {
        assert!(find(DEFAULT).is_some());
        assert!(find("plasma").is_none());
        assert_eq!(names(), vec!["gradient", "mandelbulb"]);
    }
}
