mod common;

use common::DOUBLE_WGSL;
use common::MockDevice;
use nano::BufferId;
use nano::BufferInit;
use nano::NanoError;
use nano::Readback;
use nano::ResourceManager;

fn setup(device: &mut MockDevice) -> (ResourceManager, BufferId)
{
        let mut resources = ResourceManager::new(4, 16);

        let shader = resources.create_shader(DOUBLE_WGSL, Some("double")).unwrap();

        let data: Vec<f32> = (0..16).map(|i| i as f32).collect();

        let buffer = resources
                .create_buffer(device, shader, 0, 0, BufferInit::from_slice(&data))
                .unwrap();

        (resources, buffer)
}

#[test]
fn readback_cycles_through_its_states()
{
        let mut device = MockDevice::new();
        let (resources, buffer) = setup(&mut device);

        let mut readback = Readback::new(buffer, 16 * 4);

        assert!(!readback.is_locked());
        assert!(!readback.poll(&mut device).unwrap());

        readback.copy_to_cpu(&mut device, &resources, None).unwrap();

        assert!(!readback.is_locked());
        assert!(readback.is_in_flight());
        assert_eq!(device.live_of("buffer"), 2);
        assert!(matches!(
                readback.copy_to_cpu(&mut device, &resources, None),
                Err(NanoError::ReadbackBusy)
        ));

        assert!(!readback.poll(&mut device).unwrap());
        assert!(!readback.is_locked());
        assert!(readback.data().is_none());

        device.complete_maps();

        assert!(readback.poll(&mut device).unwrap());
        assert!(readback.is_locked());
        assert!(!readback.is_in_flight());
        assert_eq!(device.live_of("buffer"), 1, "owned staging buffer is freed once read");

        let values = readback.data_as::<f32>().unwrap();
        assert_eq!(values.len(), 16);
        assert_eq!(values[15], 15.0);

        assert!(matches!(
                readback.copy_to_cpu(&mut device, &resources, None),
                Err(NanoError::ReadbackBusy)
        ));

        readback.release(&mut device);

        assert!(!readback.is_locked());
        assert!(!readback.is_in_flight());
        assert!(readback.data().is_none());

        readback.copy_to_cpu(&mut device, &resources, None).unwrap();
        assert!(device.polls >= 2);
}

#[test]
fn readback_sees_shader_writes()
{
        let mut device = MockDevice::new();
        let (resources, buffer) = setup(&mut device);

        let handle = resources.buffer(buffer).unwrap().handle;

        device.set_contents(handle, bytemuck::cast_slice(&[2.0f32, 4.0, 6.0, 8.0]));

        let mut readback = Readback::new(buffer, 8).with_offsets(4, 0);

        readback.copy_to_cpu(&mut device, &resources, None).unwrap();
        device.complete_maps();

        assert!(readback.poll(&mut device).unwrap());
        assert_eq!(readback.data_as::<f32>().unwrap(), vec![4.0, 6.0]);
}

#[test]
fn failed_map_unlocks_the_readback()
{
        let mut device = MockDevice::new();
        let (resources, buffer) = setup(&mut device);

        let mut readback = Readback::new(buffer, 64);

        readback.copy_to_cpu(&mut device, &resources, None).unwrap();
        device.fail_maps("device lost");

        assert!(matches!(
                readback.poll(&mut device),
                Err(NanoError::ReadbackFailed(message)) if message == "device lost"
        ));
        assert!(!readback.is_locked());
        assert!(!readback.is_in_flight());
        assert_eq!(device.live_of("buffer"), 1);
}

#[test]
fn caller_staging_buffer_is_kept()
{
        let mut device = MockDevice::new();
        let (resources, buffer) = setup(&mut device);

        let staging = nano::gpu::GpuDevice::create_buffer(
                &mut device,
                &nano::gpu::BufferDesc {
                        label: "staging",
                        size: 128,
                        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                },
        )
        .unwrap();

        let mut readback = Readback::new(buffer, 16).with_offsets(0, 32);

        readback.copy_to_cpu(&mut device, &resources, Some(staging)).unwrap();
        device.complete_maps();

        assert!(readback.poll(&mut device).unwrap());
        assert_eq!(readback.data_as::<f32>().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(device.live_of("buffer"), 2);
}

#[test]
fn releasing_in_flight_frees_staging()
{
        let mut device = MockDevice::new();
        let (resources, buffer) = setup(&mut device);

        let mut readback = Readback::new(buffer, 64);

        readback.copy_to_cpu(&mut device, &resources, None).unwrap();
        assert_eq!(device.live_of("buffer"), 2);

        readback.release(&mut device);

        assert!(!readback.is_in_flight());
        assert_eq!(device.live_of("buffer"), 1);
}

#[test]
fn out_of_bounds_copy_is_rejected()
{
        let mut device = MockDevice::new();
        let (resources, buffer) = setup(&mut device);

        let mut readback = Readback::new(buffer, 64).with_offsets(8, 0);

        assert!(matches!(
                readback.copy_to_cpu(&mut device, &resources, None),
                Err(NanoError::ReadbackFailed(_))
        ));
        assert!(!readback.is_in_flight());

        let mut missing = Readback::new(BufferId::from_label("nothing"), 4);

        assert!(matches!(
                missing.copy_to_cpu(&mut device, &resources, None),
                Err(NanoError::BufferNotFound(_))
        ));
}
