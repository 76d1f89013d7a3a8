use volley_core::{CarData, ControlCmd, Orientation, Vector3};
use volley_simulator::SimulationConfig;

/// Attitude controller for an airborne car.
///
/// A PD law on the rotation error gives the desired angular acceleration, which is
/// mapped back to roll/pitch/yaw inputs through the air torque model.
#[derive(Debug, Clone)]
pub struct Reorient {
    kp: f64,
    kd: f64,
    torque: Vector3,
    damping: Vector3,
    target: Option<Orientation>,
}

impl Reorient {
    pub fn new(kp: f64, kd: f64, model: &SimulationConfig) -> Self {
        Reorient {
            kp,
            kd,
            torque: model.air_torque,
            damping: model.air_damping,
            target: None,
        }
    }

    pub fn set_setpoint(&mut self, setpoint: Orientation) {
        self.target = Some(setpoint);
    }

    /// Write the roll, pitch and yaw inputs for this step into `controls`.
    pub fn update(&self, car: &CarData, controls: &mut ControlCmd) {
        let Some(target) = self.target else {
            controls.roll = 0.0;
            controls.pitch = 0.0;
            controls.yaw = 0.0;
            return;
        };

        // Rotation that takes the current orientation onto the target, in the car frame
        let error = car.to_local(&(target * car.orientation.inverse()).scaled_axis());
        let omega = car.to_local(&car.angular_velocity);

        let alpha = error * self.kp - omega * self.kd;
        let input = (alpha + self.damping.component_mul(&omega)).component_div(&self.torque);

        controls.roll = input.x.clamp(-1.0, 1.0);
        controls.pitch = input.y.clamp(-1.0, 1.0);
        controls.yaw = input.z.clamp(-1.0, 1.0);
    }
}
