mod declare;
mod library_shapes;
