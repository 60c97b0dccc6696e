use hardware::{ActuatorInterface, DigitalInput, DigitalOutput, RangingInterface, VisionInterface};

/// Collaborators the control loop drives during one run.
///
/// Borrowed for the duration of the run so the caller keeps ownership of the
/// drivers (and can inspect mocks afterwards).
pub struct TurretPeripherals<'a> {
    pub vision: &'a mut dyn VisionInterface,
    pub ranger: &'a mut dyn RangingInterface,
    /// Acknowledgement button, high when pressed
    pub acknowledge: &'a mut dyn DigitalInput,
    pub actuator: &'a mut dyn ActuatorInterface,
    /// Status LED, advisory only
    pub indicator: &'a mut dyn DigitalOutput,
    pub laser: &'a mut dyn DigitalOutput,
    /// Sounded when a target has to be skipped
    pub buzzer: Option<&'a mut dyn DigitalOutput>,
}

impl TurretPeripherals<'_> {
    /// Drive laser, indicator and buzzer low. Returns a description of each output that failed.
    pub fn force_safe(&mut self) -> Vec<String> {
        let mut faults = Vec::new();
        if let Err(e) = self.laser.set_level(false) {
            log::error!("Failed to switch laser off: {e}");
            faults.push(format!("laser: {e}"));
        }
        if let Err(e) = self.indicator.set_level(false) {
            log::warn!("Failed to switch indicator off: {e}");
            faults.push(format!("indicator: {e}"));
        }
        if let Some(buzzer) = self.buzzer.as_deref_mut() {
            if let Err(e) = buzzer.set_level(false) {
                log::warn!("Failed to silence buzzer: {e}");
                faults.push(format!("buzzer: {e}"));
            }
        }
        faults
    }
}
