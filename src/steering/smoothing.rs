//! Exponentielle Glättung des Rohwinkels

/// Ein EMA-Schritt: `alpha * raw + (1 - alpha) * previous`
pub fn smooth(previous: f64, raw: f64, alpha: f64) -> f64 {
    alpha * raw + (1.0 - alpha) * previous
}

/// Hält den geglätteten Lenkwinkel über Zyklen hinweg
///
/// Ohne neuen Messwert bleibt der letzte Winkel stehen. Ein fehlender Messwert
/// bedeutet nicht, dass das Lenkrad in der Mitte steht.
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    current_angle: f64,
    alpha: f64,
}

impl AngleSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            current_angle: 0.0,
            alpha,
        }
    }

    pub fn update(&mut self, raw: Option<f64>) -> f64 {
        if let Some(raw) = raw {
            self.current_angle = smooth(self.current_angle, raw, self.alpha);
        }
        self.current_angle
    }

    pub fn current(&self) -> f64 {
        self.current_angle
    }
}
